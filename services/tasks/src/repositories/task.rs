//! Task repository for the `tasks` table

use common::{
    backend::{Filter, TableBackend},
    error::BackendResult,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{decode_inserted, decode_rows};
use crate::models::{NewTask, Task, UpdateTask};

const TABLE: &str = "tasks";
const COLUMNS: &str = "id, group_id, title, status";

/// Task repository
#[derive(Clone)]
pub struct TaskRepository {
    backend: Arc<dyn TableBackend>,
}

impl TaskRepository {
    /// Create a new task repository
    pub fn new(backend: Arc<dyn TableBackend>) -> Self {
        Self { backend }
    }

    /// Get all tasks of a group
    pub async fn find_by_group(&self, group_id: Uuid) -> BackendResult<Vec<Task>> {
        let rows = self
            .backend
            .select(TABLE, COLUMNS, &Filter::eq("group_id", group_id))
            .await?;
        decode_rows(rows)
    }

    /// Create a new task
    pub async fn create(&self, task: &NewTask) -> BackendResult<Task> {
        info!("Creating task in group: {}", task.group_id);

        let record = serde_json::to_value(task)?;
        let rows = self.backend.insert(TABLE, vec![record], COLUMNS).await?;
        decode_inserted(rows, TABLE)
    }

    /// Update the title and status of a task
    pub async fn update(&self, id: Uuid, changes: &UpdateTask) -> BackendResult<()> {
        info!("Updating task: {}", id);

        let fields = serde_json::to_value(changes)?;
        self.backend.update(TABLE, fields, &Filter::eq("id", id)).await
    }

    /// Delete a task
    pub async fn delete(&self, id: Uuid) -> BackendResult<()> {
        info!("Deleting task: {}", id);
        self.backend.delete(TABLE, &Filter::eq("id", id)).await
    }
}
