//! Core types for the sync engine

mod board;
mod event;
mod ids;
mod mutation;
mod task;

// Re-export all types
pub use board::{BoardView, Column, ColumnView};
pub use event::{RemoteEvent, RemotePayload};
pub use ids::{ClientMutationId, ColumnId, ProjectId, TaskId};
pub use mutation::{Mutation, MutationKind, MutationTarget, PendingMutation, ServerState};
pub use task::{Priority, Task, TaskStatus};
