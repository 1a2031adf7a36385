//! Custom error types for the common library
//!
//! This module defines the error type reported by every call made against
//! the hosted auth/data service, whichever backend implementation is used.

use reqwest::Error as ReqwestError;
use thiserror::Error;

/// Custom error type for backend operations
#[derive(Error, Debug)]
pub enum BackendError {
    /// The request never produced a response
    #[error("Backend transport error: {0}")]
    Transport(#[source] ReqwestError),

    /// The service answered with a non-success status
    #[error("{message}")]
    Service {
        /// HTTP status (or an equivalent code for non-HTTP backends)
        status: u16,
        /// Message reported by the service
        message: String,
    },

    /// The response body did not have the expected shape
    #[error("Backend decode error: {0}")]
    Decode(String),

    /// The operation requires a signed-in session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Configuration error
    #[error("Backend configuration error: {0}")]
    Configuration(String),
}

impl BackendError {
    /// Build a service error from a status and message
    pub fn service(status: u16, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            message: message.into(),
        }
    }

    /// Message suitable for showing to a user
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Service { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether the service turned the request down as a client error (4xx)
    pub fn is_rejection(&self) -> bool {
        matches!(self, BackendError::Service { status, .. } if (400..500).contains(status))
    }
}

impl From<ReqwestError> for BackendError {
    fn from(err: ReqwestError) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err)
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

/// Type alias for Result with BackendError
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_displays_service_message() {
        let err = BackendError::service(400, "Invalid login credentials");
        assert_eq!(err.to_string(), "Invalid login credentials");
        assert_eq!(err.user_message(), "Invalid login credentials");
    }

    #[test]
    fn only_client_errors_are_rejections() {
        assert!(BackendError::service(400, "Invalid login credentials").is_rejection());
        assert!(BackendError::service(422, "Email not confirmed").is_rejection());
        assert!(!BackendError::service(503, "Service Unavailable").is_rejection());
        assert!(!BackendError::NotAuthenticated.is_rejection());
        assert!(!BackendError::Decode("bad body".to_string()).is_rejection());
    }

    #[test]
    fn json_errors_become_decode_errors() {
        let err: BackendError = serde_json::from_str::<u32>("\"x\"").unwrap_err().into();
        assert!(matches!(err, BackendError::Decode(_)));
    }
}
