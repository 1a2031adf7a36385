//! Task store for the Taskboard client
//!
//! Keeps a local mirror of a user's task groups and tasks in sync with the
//! `taskgroups` and `tasks` tables of the hosted data service.

pub mod error;
pub mod models;
pub mod repositories;
pub mod store;

pub use error::{TaskError, TaskResult};
pub use models::{GroupWithTasks, Task, TaskGroup, TaskStatus};
pub use store::{LoadReport, TaskStore};
