//! Session service for the Taskboard client
//!
//! Tracks who is signed in and performs sign-up, sign-in and sign-out
//! against the hosted auth service, with local input validation and a
//! consecutive-failure lock on sign-in.

pub mod error;
pub mod models;
pub mod rate_limiter;
pub mod repositories;
pub mod session;
pub mod validation;

pub use error::{AuthError, AuthResult};
pub use models::{AuthStatus, SessionState, SessionUser, SignUpRequest};
pub use session::SessionManager;
