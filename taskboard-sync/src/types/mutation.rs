//! Local mutations and their authoritative results

use super::board::Column;
use super::ids::{ClientMutationId, ColumnId, TaskId};
use super::task::Task;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification of a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationKind {
    Move,
    Create,
    Update,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Move => "move",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// The record a mutation or event is about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "entity", content = "id", rename_all = "snake_case")]
pub enum MutationTarget {
    Task(TaskId),
    Column(ColumnId),
}

impl fmt::Display for MutationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(id) => write!(f, "task {}", id),
            Self::Column(id) => write!(f, "column {}", id),
        }
    }
}

/// A desired change to the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Place a task at `index` of `column_id` (index is the final position)
    MoveTask {
        task_id: TaskId,
        column_id: ColumnId,
        index: usize,
    },
    /// Insert a new task; its `order` is the desired index
    CreateTask { task: Task },
    /// Replace a task's fields
    UpdateTask { task: Task },
    DeleteTask { task_id: TaskId },
    /// Insert a new column; its `order` is the desired index
    CreateColumn { column: Column },
    UpdateColumn { column: Column },
    /// Delete a column and every task in it
    DeleteColumn { column_id: ColumnId },
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::MoveTask { .. } => MutationKind::Move,
            Self::CreateTask { .. } | Self::CreateColumn { .. } => MutationKind::Create,
            Self::UpdateTask { .. } | Self::UpdateColumn { .. } => MutationKind::Update,
            Self::DeleteTask { .. } | Self::DeleteColumn { .. } => MutationKind::Delete,
        }
    }

    pub fn target(&self) -> MutationTarget {
        match self {
            Self::MoveTask { task_id, .. } | Self::DeleteTask { task_id } => {
                MutationTarget::Task(task_id.clone())
            }
            Self::CreateTask { task } | Self::UpdateTask { task } => {
                MutationTarget::Task(task.id.clone())
            }
            Self::CreateColumn { column } | Self::UpdateColumn { column } => {
                MutationTarget::Column(column.id.clone())
            }
            Self::DeleteColumn { column_id } => MutationTarget::Column(column_id.clone()),
        }
    }
}

/// A local mutation tagged for correlation with its response and echo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMutation {
    pub client_mutation_id: ClientMutationId,
    pub mutation: Mutation,
    /// Client clock when the gesture was issued
    pub issued_at: DateTime<Utc>,
}

impl PendingMutation {
    /// Tag a mutation with a fresh client mutation id, issued now
    pub fn new(mutation: Mutation) -> Self {
        Self {
            client_mutation_id: ClientMutationId::new(),
            mutation,
            issued_at: Utc::now(),
        }
    }

    pub fn with_client_mutation_id(mut self, id: ClientMutationId) -> Self {
        self.client_mutation_id = id;
        self
    }

    pub fn with_issued_at(mut self, issued_at: DateTime<Utc>) -> Self {
        self.issued_at = issued_at;
        self
    }

    pub fn kind(&self) -> MutationKind {
        self.mutation.kind()
    }

    pub fn target(&self) -> MutationTarget {
        self.mutation.target()
    }
}

/// Canonical state returned by the server (or carried by a remote event)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ServerState {
    Task(Task),
    Column(Column),
    TaskDeleted(TaskId),
    ColumnDeleted(ColumnId),
}

impl ServerState {
    pub fn target(&self) -> MutationTarget {
        match self {
            Self::Task(task) => MutationTarget::Task(task.id.clone()),
            Self::Column(column) => MutationTarget::Column(column.id.clone()),
            Self::TaskDeleted(id) => MutationTarget::Task(id.clone()),
            Self::ColumnDeleted(id) => MutationTarget::Column(id.clone()),
        }
    }
}
