//! Ordered-collection synchronization engine for kanban boards
//!
//! This crate keeps a board's column membership and within-column task order
//! consistent while three independent sources mutate it:
//!
//! - **Local gestures** - drag-and-drop moves and create/update/delete forms,
//!   applied optimistically so the UI responds immediately
//! - **Request round-trips** - the board API's authoritative response (or
//!   failure) for each of those local mutations
//! - **Remote events** - real-time notifications of work done by collaborators
//!
//! ## Overview
//!
//! - [`OrderedList`] - dense 0-based ranking of ids with insert/move/remove
//! - [`BoardStore`] - normalized column and task maps plus listeners
//! - [`MutationReconciler`] - the per-mutation state machine
//!   (`Pending` → `Confirmed` | `Rejected` | `SupersededByRemote`)
//! - [`BoardSession`] - one open board: reconciler + [`BoardApi`] client
//! - [`DragController`] - turns drop gestures into move mutations
//!
//! ## Basic Usage
//!
//! ```rust,ignore
//! use taskboard_sync::{BoardSession, DragController, ProjectId};
//!
//! let session = BoardSession::open(api, ProjectId::from("p1"), &config).await?;
//! let drag = DragController::new(session.clone(), config.drag.clone());
//!
//! // Card "t1" dropped into column "doing" at index 1
//! drag.on_drop("t1".into(), "doing".into(), 1).await?;
//!
//! // Real-time events are folded in through the same reconciler
//! tokio::spawn(async move { session.run_remote_events(rx).await });
//! ```
//!
//! Everything is in-memory; durability is the server's job.

pub mod api;
pub mod drag;
mod error;
pub mod ordered_list;
pub mod reconciler;
pub mod session;
pub mod store;
pub mod types;

#[cfg(feature = "test-support")]
pub mod test_support;

pub use api::{ApiError, BoardApi, BoardSnapshot};
pub use drag::{DragController, DropGesture, DropIgnored, DropOutcome, DropTarget};
pub use error::{Result, SyncError};
pub use ordered_list::OrderedList;
pub use reconciler::{
    AuthoritativeOutcome, IgnoreReason, MutationReconciler, MutationState, OptimisticOutcome,
    RejectOutcome, RemoteOutcome,
};
pub use session::{BoardSession, DispatchOutcome};
pub use store::{BoardEvent, BoardListener, BoardStore, ColumnStore, RemovedColumn, TaskStore};

pub use types::{
    BoardView, ClientMutationId, Column, ColumnId, ColumnView, Mutation, MutationKind,
    MutationTarget, PendingMutation, Priority, ProjectId, RemoteEvent, RemotePayload,
    ServerState, Task, TaskId, TaskStatus,
};
