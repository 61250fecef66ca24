//! Board-level types: Column and the rendered board view

use super::ids::{ColumnId, ProjectId};
use super::task::Task;
use serde::{Deserialize, Serialize};

/// A column defines a workflow stage. `order` is its rank among sibling columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    pub project_id: ProjectId,
    pub name: String,
    pub order: usize,
}

impl Column {
    pub fn new(
        id: impl Into<ColumnId>,
        project_id: impl Into<ProjectId>,
        name: impl Into<String>,
        order: usize,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            name: name.into(),
            order,
        }
    }

    /// A not-yet-persisted column with a temporary id
    pub fn draft(project_id: impl Into<ProjectId>, name: impl Into<String>, order: usize) -> Self {
        Self::new(ColumnId::temporary(), project_id, name, order)
    }
}

/// One column with its tasks in display order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnView {
    #[serde(flatten)]
    pub column: Column,
    pub tasks: Vec<Task>,
}

/// Read model of a whole board, in display order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub project_id: ProjectId,
    pub columns: Vec<ColumnView>,
}

impl BoardView {
    /// Task ids per column, in order. Handy for asserting board layouts.
    pub fn layout(&self) -> Vec<(String, Vec<String>)> {
        self.columns
            .iter()
            .map(|c| {
                (
                    c.column.id.to_string(),
                    c.tasks.iter().map(|t| t.id.to_string()).collect(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_draft() {
        let column = Column::draft("p1", "Blocked", 2);
        assert!(column.id.is_temporary());
        assert_eq!(column.order, 2);
    }

    #[test]
    fn test_view_serializes_flattened_columns() {
        let view = BoardView {
            project_id: "p1".into(),
            columns: vec![ColumnView {
                column: Column::new("todo", "p1", "To Do", 0),
                tasks: vec![Task::new("t1", "p1", "todo", 0, "One")],
            }],
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["columns"][0]["id"], "todo");
        assert_eq!(json["columns"][0]["tasks"][0]["id"], "t1");
        assert_eq!(view.layout(), vec![("todo".to_string(), vec!["t1".to_string()])]);
    }
}
