//! Task records

use super::ids::{ColumnId, ProjectId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Backlog,
    #[default]
    Todo,
    InProgress,
    InReview,
    Done,
    Cancelled,
}

/// A task card. Lives in exactly one column; `order` is its dense rank there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub column_id: ColumnId,
    /// Position among the column's tasks. Only meaningful relative to siblings.
    pub order: usize,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(default)]
    pub assignees: BTreeSet<String>,
    /// Server modification stamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a task with the given id, placed at `order` in `column_id`
    pub fn new(
        id: impl Into<TaskId>,
        project_id: impl Into<ProjectId>,
        column_id: impl Into<ColumnId>,
        order: usize,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            column_id: column_id.into(),
            order,
            title: title.into(),
            description: String::new(),
            priority: Priority::default(),
            status: TaskStatus::default(),
            due_date: None,
            labels: BTreeSet::new(),
            assignees: BTreeSet::new(),
            updated_at: None,
        }
    }

    /// A not-yet-persisted task with a temporary id, for optimistic creation
    pub fn draft(
        project_id: impl Into<ProjectId>,
        column_id: impl Into<ColumnId>,
        order: usize,
        title: impl Into<String>,
    ) -> Self {
        Self::new(TaskId::temporary(), project_id, column_id, order, title)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into());
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignees.insert(assignee.into());
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Whether the due date has passed at `now` (done and cancelled tasks are never overdue)
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => {
                due < now && !matches!(self.status, TaskStatus::Done | TaskStatus::Cancelled)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_task_creation() {
        let task = Task::new("t1", "p1", "todo", 0, "Write docs");
        assert_eq!(task.title, "Write docs");
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.status, TaskStatus::Todo);
        assert!(task.labels.is_empty());
    }

    #[test]
    fn test_draft_has_temporary_id() {
        let task = Task::draft("p1", "todo", 3, "New");
        assert!(task.id.is_temporary());
        assert_eq!(task.order, 3);
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let task = Task::new("t1", "p1", "todo", 2, "Card")
            .with_status(TaskStatus::InProgress)
            .with_priority(Priority::Urgent)
            .with_label("bug");
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["columnId"], "todo");
        assert_eq!(json["projectId"], "p1");
        assert_eq!(json["status"], "IN_PROGRESS");
        assert_eq!(json["priority"], "URGENT");
        assert_eq!(json["labels"][0], "bug");
        assert!(json.get("dueDate").is_none());
    }

    #[test]
    fn test_minimal_server_payload_parses() {
        let json = r#"{"id":"t9","projectId":"p1","columnId":"done","order":0,"title":"X"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.column_id.as_str(), "done");
        assert_eq!(task.status, TaskStatus::Todo);
        assert!(task.updated_at.is_none());
    }

    #[test]
    fn test_overdue() {
        let now = Utc::now();
        let task = Task::new("t1", "p1", "todo", 0, "Late").with_due_date(now - Duration::days(1));
        assert!(task.is_overdue(now));
        assert!(!task.clone().with_status(TaskStatus::Done).is_overdue(now));
        assert!(!Task::new("t2", "p1", "todo", 0, "None").is_overdue(now));
    }
}
