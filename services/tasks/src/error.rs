//! Custom error types for the task service

use common::error::BackendError;
use thiserror::Error;
use uuid::Uuid;

/// Custom error type for task operations
#[derive(Error, Debug)]
pub enum TaskError {
    /// Input rejected before any call was made
    #[error("{0}")]
    Validation(String),

    /// A mutation failed on the service
    #[error("{0}")]
    Remote(String),

    /// Loading failed on the service
    #[error("failed to fetch {what}: {message}")]
    Fetch { what: String, message: String },
}

impl TaskError {
    /// Fetch error for the groups of a user
    pub fn groups_fetch(err: &BackendError) -> Self {
        TaskError::Fetch {
            what: "task groups".to_string(),
            message: err.user_message(),
        }
    }

    /// Fetch error for the tasks of one group
    pub fn tasks_fetch(group_id: Uuid, err: &BackendError) -> Self {
        TaskError::Fetch {
            what: format!("tasks of group {}", group_id),
            message: err.user_message(),
        }
    }
}

impl From<BackendError> for TaskError {
    fn from(err: BackendError) -> Self {
        TaskError::Remote(err.user_message())
    }
}

/// Type alias for task results
pub type TaskResult<T> = Result<T, TaskError>;
