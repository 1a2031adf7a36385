//! Task service models

pub mod group;
pub mod task;

pub use group::{GroupWithTasks, NewTaskGroup, TaskGroup, UpdateTaskGroup};
pub use task::{NewTask, Task, TaskStatus, UpdateTask};

/// Trim a title, rejecting one that is left empty
pub(crate) fn required_title(title: &str, what: &str) -> Result<String, String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(format!("{} title is required", what));
    }
    Ok(title.to_string())
}

/// Trim an optional description, dropping it when left empty
pub(crate) fn optional_text(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_title() {
        assert_eq!(required_title("  Home ", "Group"), Ok("Home".to_string()));
        assert_eq!(
            required_title(" \t ", "Task"),
            Err("Task title is required".to_string())
        );
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text(Some(" chores ")), Some("chores".to_string()));
        assert_eq!(optional_text(Some("   ")), None);
        assert_eq!(optional_text(None), None);
    }
}
