//! Task models

use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Progress of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Value stored in the `status` column
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In progress",
            TaskStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            other => Err(format!("Unknown task status: {}", other)),
        }
    }
}

/// A missing or null status reads as pending
fn status_or_pending<'de, D>(deserializer: D) -> Result<TaskStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TaskStatus>::deserialize(deserializer)?.unwrap_or_default())
}

/// Task entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub group_id: Uuid,
    pub title: String,
    #[serde(default, deserialize_with = "status_or_pending")]
    pub status: TaskStatus,
}

/// New task creation payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTask {
    pub group_id: Uuid,
    pub title: String,
    pub status: TaskStatus,
}

/// Task update payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateTask {
    pub title: String,
    pub status: TaskStatus,
}
