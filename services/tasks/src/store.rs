//! Task store
//!
//! Local mirror of a user's task groups and their tasks. Every mutation is
//! sent to the service first; the mirror is only patched once the service
//! has accepted it, so what is shown is always what was saved.

use common::backend::TableBackend;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::{TaskError, TaskResult},
    models::{
        GroupWithTasks, NewTask, NewTaskGroup, Task, TaskGroup, TaskStatus, UpdateTask,
        UpdateTaskGroup, optional_text, required_title,
    },
    repositories::{TaskGroupRepository, TaskRepository},
};

/// Outcome of a load that went through
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Groups whose tasks could not be fetched; they are mirrored empty
    pub errors: Vec<TaskError>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Local mirror of task groups and tasks
pub struct TaskStore {
    groups: TaskGroupRepository,
    tasks: TaskRepository,
    mirror: Vec<GroupWithTasks>,
}

impl TaskStore {
    /// Create an empty store
    pub fn new(backend: Arc<dyn TableBackend>) -> Self {
        Self {
            groups: TaskGroupRepository::new(backend.clone()),
            tasks: TaskRepository::new(backend),
            mirror: Vec::new(),
        }
    }

    /// Mirrored groups, in load and creation order
    pub fn groups(&self) -> &[GroupWithTasks] {
        &self.mirror
    }

    /// One mirrored group
    pub fn group(&self, group_id: Uuid) -> Option<&GroupWithTasks> {
        self.mirror.iter().find(|entry| entry.id() == group_id)
    }

    /// Forget everything, e.g. after sign-out
    pub fn clear(&mut self) {
        self.mirror.clear();
    }

    fn group_mut(&mut self, group_id: Uuid) -> Option<&mut GroupWithTasks> {
        self.mirror.iter_mut().find(|entry| entry.id() == group_id)
    }

    /// Fetch the groups of a user and the tasks of each group.
    ///
    /// Task fetches run concurrently. A group whose tasks fail to load is
    /// kept with no tasks and reported; failing to list the groups fails the
    /// whole load and leaves the mirror as it was.
    pub async fn load_groups(&mut self, user_id: Uuid) -> TaskResult<LoadReport> {
        info!("Loading task groups for user: {}", user_id);

        let groups = self.groups.find_by_user(user_id).await.map_err(|e| {
            error!("Failed to fetch task groups: {}", e);
            TaskError::groups_fetch(&e)
        })?;

        let tasks = &self.tasks;
        let fetches = groups.into_iter().map(|group| async move {
            let result = tasks.find_by_group(group.id).await;
            (group, result)
        });

        let mut report = LoadReport::default();
        let mut mirror = Vec::new();
        for (group, result) in join_all(fetches).await {
            match result {
                Ok(tasks) => mirror.push(GroupWithTasks::new(group, tasks)),
                Err(e) => {
                    error!("Failed to fetch tasks for group {}: {}", group.id, e);
                    report.errors.push(TaskError::tasks_fetch(group.id, &e));
                    mirror.push(GroupWithTasks::new(group, Vec::new()));
                }
            }
        }

        info!(
            "Loaded {} task groups ({} with errors)",
            mirror.len(),
            report.errors.len()
        );
        self.mirror = mirror;
        Ok(report)
    }

    /// Create a group for a user
    pub async fn create_group(
        &mut self,
        user_id: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> TaskResult<TaskGroup> {
        let title = required_title(title, "Group").map_err(TaskError::Validation)?;

        let new_group = NewTaskGroup {
            user_id,
            title,
            description: optional_text(description),
        };
        let group = self.groups.create(&new_group).await.map_err(|e| {
            error!("Failed to create task group: {}", e);
            TaskError::from(e)
        })?;

        self.mirror
            .push(GroupWithTasks::new(group.clone(), Vec::new()));
        Ok(group)
    }

    /// Change the title and description of a group
    pub async fn update_group(
        &mut self,
        group_id: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> TaskResult<()> {
        let changes = UpdateTaskGroup {
            title: required_title(title, "Group").map_err(TaskError::Validation)?,
            description: optional_text(description),
        };

        self.groups.update(group_id, &changes).await.map_err(|e| {
            error!("Failed to update task group {}: {}", group_id, e);
            TaskError::from(e)
        })?;

        if let Some(entry) = self.group_mut(group_id) {
            entry.group.title = changes.title;
            entry.group.description = changes.description;
        }
        Ok(())
    }

    /// Delete a group
    pub async fn delete_group(&mut self, group_id: Uuid) -> TaskResult<()> {
        self.groups.delete(group_id).await.map_err(|e| {
            error!("Failed to delete task group {}: {}", group_id, e);
            TaskError::from(e)
        })?;

        self.mirror.retain(|entry| entry.id() != group_id);
        Ok(())
    }

    /// Add a task to a group; the status defaults to pending
    pub async fn create_task(
        &mut self,
        group_id: Uuid,
        title: &str,
        status: Option<TaskStatus>,
    ) -> TaskResult<Task> {
        let title = required_title(title, "Task").map_err(TaskError::Validation)?;

        let new_task = NewTask {
            group_id,
            title,
            status: status.unwrap_or_default(),
        };
        let task = self.tasks.create(&new_task).await.map_err(|e| {
            error!("Failed to create task: {}", e);
            TaskError::from(e)
        })?;

        match self.group_mut(group_id) {
            Some(entry) => entry.tasks.push(task.clone()),
            None => warn!("Created task {} for unmirrored group {}", task.id, group_id),
        }
        Ok(task)
    }

    /// Change the title and status of a task
    pub async fn update_task(
        &mut self,
        group_id: Uuid,
        task_id: Uuid,
        title: &str,
        status: TaskStatus,
    ) -> TaskResult<()> {
        let changes = UpdateTask {
            title: required_title(title, "Task").map_err(TaskError::Validation)?,
            status,
        };

        self.tasks.update(task_id, &changes).await.map_err(|e| {
            error!("Failed to update task {}: {}", task_id, e);
            TaskError::from(e)
        })?;

        if let Some(task) = self
            .group_mut(group_id)
            .and_then(|entry| entry.tasks.iter_mut().find(|task| task.id == task_id))
        {
            task.title = changes.title;
            task.status = changes.status;
        }
        Ok(())
    }

    /// Delete a task
    pub async fn delete_task(&mut self, group_id: Uuid, task_id: Uuid) -> TaskResult<()> {
        self.tasks.delete(task_id).await.map_err(|e| {
            error!("Failed to delete task {}: {}", task_id, e);
            TaskError::from(e)
        })?;

        if let Some(entry) = self.group_mut(group_id) {
            entry.tasks.retain(|task| task.id != task_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{
        backend::Filter,
        memory::{Failure, InMemoryBackend, Operation},
    };
    use serde_json::json;
    use tokio_test::assert_ok;

    struct Fixture {
        backend: Arc<InMemoryBackend>,
        store: TaskStore,
        user_id: Uuid,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(InMemoryBackend::new());
        Fixture {
            store: TaskStore::new(backend.clone()),
            backend,
            user_id: Uuid::new_v4(),
        }
    }

    async fn seed_group(backend: &InMemoryBackend, user_id: Uuid, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        backend
            .seed(
                "taskgroups",
                vec![json!({"id": id, "user_id": user_id, "title": title, "description": null})],
            )
            .await;
        id
    }

    async fn seed_task(backend: &InMemoryBackend, group_id: Uuid, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        backend
            .seed(
                "tasks",
                vec![json!({"id": id, "group_id": group_id, "title": title, "status": "pending"})],
            )
            .await;
        id
    }

    #[tokio::test]
    async fn test_load_groups_tolerates_task_fetch_failure() {
        let Fixture {
            backend,
            mut store,
            user_id,
        } = fixture();
        let g1 = seed_group(&backend, user_id, "Work").await;
        let g2 = seed_group(&backend, user_id, "Home").await;
        seed_group(&backend, Uuid::new_v4(), "Someone else").await;
        let t1 = seed_task(&backend, g1, "Report").await;
        let t2 = seed_task(&backend, g1, "Review").await;
        seed_task(&backend, g2, "Dishes").await;
        backend
            .fail(
                Failure::on(Operation::Select)
                    .table("tasks")
                    .filter(Filter::eq("group_id", g2)),
            )
            .await;

        let report = store.load_groups(user_id).await.unwrap();

        let groups = store.groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].id(), g1);
        assert_eq!(
            groups[0].tasks.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![t1, t2]
        );
        assert_eq!(groups[1].id(), g2);
        assert!(groups[1].tasks.is_empty());

        assert_eq!(report.errors.len(), 1);
        assert!(matches!(report.errors[0], TaskError::Fetch { .. }));
        // One group listing plus one task listing per group
        assert_eq!(backend.count(Operation::Select).await, 3);
    }

    #[tokio::test]
    async fn test_load_groups_failure_keeps_mirror() {
        let Fixture {
            backend,
            mut store,
            user_id,
        } = fixture();
        seed_group(&backend, user_id, "Work").await;
        store.load_groups(user_id).await.unwrap();

        backend
            .fail(Failure::on(Operation::Select).table("taskgroups"))
            .await;
        let err = store.load_groups(user_id).await.unwrap_err();
        assert!(matches!(err, TaskError::Fetch { .. }));
        assert_eq!(store.groups().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_titles_rejected_without_call() {
        let Fixture {
            backend,
            mut store,
            user_id,
        } = fixture();
        let group_id = seed_group(&backend, user_id, "Work").await;
        store.load_groups(user_id).await.unwrap();
        backend.clear_calls().await;

        for title in ["", "   ", "\t\n"] {
            assert!(matches!(
                store.create_group(user_id, title, Some("desc")).await,
                Err(TaskError::Validation(_))
            ));
            assert!(matches!(
                store.create_task(group_id, title, None).await,
                Err(TaskError::Validation(_))
            ));
        }
        assert!(backend.calls().await.is_empty());
        assert_eq!(store.groups().len(), 1);
        assert!(store.groups()[0].tasks.is_empty());
    }

    #[tokio::test]
    async fn test_group_round_trip() {
        let Fixture {
            backend,
            mut store,
            user_id,
        } = fixture();

        let group = store
            .create_group(user_id, "  Errands ", Some("  weekend  "))
            .await
            .unwrap();
        assert_eq!(group.title, "Errands");
        assert_eq!(group.description.as_deref(), Some("weekend"));
        assert_eq!(store.groups().len(), 1);
        assert!(store.group(group.id).unwrap().tasks.is_empty());

        store
            .update_group(group.id, "Shopping", None)
            .await
            .unwrap();
        let entry = store.group(group.id).unwrap();
        assert_eq!(entry.group.title, "Shopping");
        assert_eq!(entry.group.description, None);

        store.delete_group(group.id).await.unwrap();
        assert!(store.group(group.id).is_none());

        let operations: Vec<_> = backend
            .calls()
            .await
            .into_iter()
            .map(|call| call.operation)
            .collect();
        assert_eq!(
            operations,
            vec![Operation::Insert, Operation::Update, Operation::Delete]
        );
        assert!(backend.rows("taskgroups").await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_mutations_leave_mirror_untouched() {
        let Fixture {
            backend,
            mut store,
            user_id,
        } = fixture();
        let group_id = seed_group(&backend, user_id, "Work").await;
        let task_id = seed_task(&backend, group_id, "Report").await;
        store.load_groups(user_id).await.unwrap();
        let before = store.groups().to_vec();

        backend.fail(Failure::on(Operation::Insert)).await;
        backend.fail(Failure::on(Operation::Update)).await;
        backend.fail(Failure::on(Operation::Delete)).await;

        assert!(matches!(
            store.create_group(user_id, "New", None).await,
            Err(TaskError::Remote(_))
        ));
        assert!(store.update_group(group_id, "Renamed", None).await.is_err());
        assert!(store.delete_group(group_id).await.is_err());
        assert!(store.create_task(group_id, "Another", None).await.is_err());
        assert!(
            store
                .update_task(group_id, task_id, "Renamed", TaskStatus::Completed)
                .await
                .is_err()
        );
        assert!(store.delete_task(group_id, task_id).await.is_err());

        assert_eq!(store.groups(), before.as_slice());
    }

    #[tokio::test]
    async fn test_task_lifecycle() {
        let Fixture {
            backend,
            mut store,
            user_id,
        } = fixture();
        let work = seed_group(&backend, user_id, "Work").await;
        let home = seed_group(&backend, user_id, "Home").await;
        store.load_groups(user_id).await.unwrap();

        let task = store.create_task(work, " Report ", None).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.title, "Report");
        assert_eq!(task.group_id, work);
        assert_eq!(store.group(work).unwrap().tasks, vec![task.clone()]);
        assert!(store.group(home).unwrap().tasks.is_empty());

        let started = store
            .create_task(home, "Dishes", Some(TaskStatus::InProgress))
            .await
            .unwrap();
        assert_eq!(started.status, TaskStatus::InProgress);

        assert_ok!(
            store
                .update_task(work, task.id, "Final report", TaskStatus::Completed)
                .await
        );
        let updated = store.group(work).unwrap().task(task.id).unwrap();
        assert_eq!(updated.title, "Final report");
        assert_eq!(updated.status, TaskStatus::Completed);
        assert_eq!(backend.rows("tasks").await[0]["status"], "completed");

        assert_ok!(store.delete_task(work, task.id).await);
        assert!(store.group(work).unwrap().tasks.is_empty());
        assert_eq!(store.group(home).unwrap().tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_absent_task_still_calls_service() {
        let Fixture {
            backend,
            mut store,
            user_id,
        } = fixture();
        let group_id = seed_group(&backend, user_id, "Work").await;
        seed_task(&backend, group_id, "Report").await;
        store.load_groups(user_id).await.unwrap();
        let before = store.groups().to_vec();
        backend.clear_calls().await;

        let absent = Uuid::new_v4();
        assert_ok!(store.delete_task(group_id, absent).await);

        assert_eq!(store.groups(), before.as_slice());
        let calls = backend.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, Operation::Delete);
        assert_eq!(calls[0].filter, Some(Filter::eq("id", absent)));
    }

    #[tokio::test]
    async fn test_clear_empties_mirror() {
        let Fixture {
            backend,
            mut store,
            user_id,
        } = fixture();
        seed_group(&backend, user_id, "Work").await;
        store.load_groups(user_id).await.unwrap();

        store.clear();
        assert!(store.groups().is_empty());
    }
}
