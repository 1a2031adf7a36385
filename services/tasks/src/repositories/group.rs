//! Task group repository for the `taskgroups` table

use common::{
    backend::{Filter, TableBackend},
    error::BackendResult,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{decode_inserted, decode_rows};
use crate::models::{NewTaskGroup, TaskGroup, UpdateTaskGroup};

const TABLE: &str = "taskgroups";
const COLUMNS: &str = "id, user_id, title, description";

/// Task group repository
#[derive(Clone)]
pub struct TaskGroupRepository {
    backend: Arc<dyn TableBackend>,
}

impl TaskGroupRepository {
    /// Create a new task group repository
    pub fn new(backend: Arc<dyn TableBackend>) -> Self {
        Self { backend }
    }

    /// Get all groups of a user
    pub async fn find_by_user(&self, user_id: Uuid) -> BackendResult<Vec<TaskGroup>> {
        let rows = self
            .backend
            .select(TABLE, COLUMNS, &Filter::eq("user_id", user_id))
            .await?;
        decode_rows(rows)
    }

    /// Create a new group
    pub async fn create(&self, group: &NewTaskGroup) -> BackendResult<TaskGroup> {
        info!("Creating task group for user: {}", group.user_id);

        let record = serde_json::to_value(group)?;
        let rows = self.backend.insert(TABLE, vec![record], COLUMNS).await?;
        decode_inserted(rows, TABLE)
    }

    /// Update the title and description of a group
    pub async fn update(&self, id: Uuid, changes: &UpdateTaskGroup) -> BackendResult<()> {
        info!("Updating task group: {}", id);

        let fields = serde_json::to_value(changes)?;
        self.backend.update(TABLE, fields, &Filter::eq("id", id)).await
    }

    /// Delete a group
    pub async fn delete(&self, id: Uuid) -> BackendResult<()> {
        info!("Deleting task group: {}", id);
        self.backend.delete(TABLE, &Filter::eq("id", id)).await
    }
}
