//! Custom error types for the auth service

use common::error::BackendError;
use thiserror::Error;

/// Custom error type for session operations
#[derive(Error, Debug)]
pub enum AuthError {
    /// Input rejected before any call was made
    #[error("{0}")]
    Validation(String),

    /// The service rejected the credentials
    #[error("incorrect credentials")]
    InvalidCredentials,

    /// Too many consecutive failed sign-ins on this client
    #[error("too many failed sign-in attempts, try again later")]
    RateLimited,

    /// Any other failure reported by the service
    #[error("{0}")]
    Remote(String),
}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        AuthError::Remote(err.user_message())
    }
}

/// Type alias for auth results
pub type AuthResult<T> = Result<T, AuthError>;
