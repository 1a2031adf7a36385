//! Task group models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::Task;

/// Task group entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskGroup {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// New task group creation payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTaskGroup {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
}

/// Task group update payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateTaskGroup {
    pub title: String,
    pub description: Option<String>,
}

/// A group together with its tasks, as mirrored locally
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupWithTasks {
    #[serde(flatten)]
    pub group: TaskGroup,
    pub tasks: Vec<Task>,
}

impl GroupWithTasks {
    pub fn new(group: TaskGroup, tasks: Vec<Task>) -> Self {
        Self { group, tasks }
    }

    pub fn id(&self) -> Uuid {
        self.group.id
    }

    /// Find a task of this group
    pub fn task(&self, task_id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }
}
