//! Session service models

pub mod profile;
pub mod session;
pub mod user;

// Re-export for convenience
pub use profile::{NewProfile, Profile};
pub use session::{AuthStatus, SessionState, SessionUser};
pub use user::SignUpRequest;
