//! Pre-mutation state captured for rollback

use crate::store::{BoardStore, RemovedColumn};
use crate::types::{ColumnId, MutationTarget, Task, TaskId};

/// The last-known-good state of one mutation target
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Snapshot {
    /// `prior` is `None` when the task did not exist (optimistic create)
    Task { task_id: TaskId, prior: Option<Task> },
    /// A column with the tasks it held; `None` for an optimistic create
    Column {
        column_id: ColumnId,
        prior: Option<RemovedColumn>,
    },
}

impl Snapshot {
    pub(crate) fn capture(store: &BoardStore, target: &MutationTarget) -> Self {
        match target {
            MutationTarget::Task(id) => Self::Task {
                task_id: id.clone(),
                prior: store.task(id).cloned(),
            },
            MutationTarget::Column(id) => Self::Column {
                column_id: id.clone(),
                prior: store.column(id).map(|column| RemovedColumn {
                    column: column.clone(),
                    tasks: store.tasks_for_column(id).into_iter().cloned().collect(),
                }),
            },
        }
    }

    /// The snapshot a superseding mutation inherits.
    ///
    /// Task and column records keep their original values. A column's member
    /// list is refreshed, since membership changes under it are not part of
    /// the superseded gesture.
    pub(crate) fn carried_over(&self, store: &BoardStore) -> Self {
        match self {
            Self::Column {
                column_id,
                prior: Some(removed),
            } if store.column(column_id).is_some() => Self::Column {
                column_id: column_id.clone(),
                prior: Some(RemovedColumn {
                    column: removed.column.clone(),
                    tasks: store
                        .tasks_for_column(column_id)
                        .into_iter()
                        .cloned()
                        .collect(),
                }),
            },
            other => other.clone(),
        }
    }
}
