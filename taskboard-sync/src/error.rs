//! Error types for the sync engine

use crate::api::ApiError;
use crate::types::{ClientMutationId, MutationKind, MutationTarget};
use std::fmt::Display;
use taskboard_common::{ErrorSeverity, Severity};
use thiserror::Error;

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while mutating or reconciling a board
#[derive(Debug, Error)]
pub enum SyncError {
    /// Id inserted into an ordered list that already contains it
    #[error("duplicate item in ordered list: {item}")]
    DuplicateItem { item: String },

    /// Id moved within an ordered list that does not contain it
    #[error("unknown item in ordered list: {item}")]
    UnknownItem { item: String },

    /// Column not present on the board
    #[error("column not found: {id}")]
    UnknownColumn { id: String },

    /// Task not present on the board
    #[error("task not found: {id}")]
    UnknownTask { id: String },

    /// Client mutation id was never applied optimistically
    #[error("unknown client mutation: {id}")]
    UnknownMutation { id: String },

    /// Client mutation id was applied optimistically twice
    #[error("client mutation already applied: {id}")]
    DuplicateMutation { id: String },

    /// Mutation references a record whose create is still in flight
    #[error("{target} is not yet persisted")]
    UnconfirmedCreate { target: String },

    /// Store consistency check failed
    #[error("board invariant violated: {message}")]
    InvariantViolation { message: String },

    /// The server refused a mutation; local state was restored
    #[error("{kind} of {target} rejected: {reason}")]
    MutationRejected {
        client_mutation_id: ClientMutationId,
        kind: MutationKind,
        target: MutationTarget,
        reason: String,
    },

    /// Board API request outside the optimistic flow (initial load, resync)
    #[error("board API error: {0}")]
    Api(#[from] ApiError),

    /// Malformed real-time frame
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    pub fn duplicate_item(item: impl Display) -> Self {
        Self::DuplicateItem {
            item: item.to_string(),
        }
    }

    pub fn unknown_item(item: impl Display) -> Self {
        Self::UnknownItem {
            item: item.to_string(),
        }
    }

    pub fn unknown_column(id: impl Display) -> Self {
        Self::UnknownColumn { id: id.to_string() }
    }

    pub fn unknown_task(id: impl Display) -> Self {
        Self::UnknownTask { id: id.to_string() }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Whether the UI should show this as a transient "reverted" notice
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::MutationRejected { .. })
    }
}

impl Severity for SyncError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            // Structural errors are bugs in the calling layer
            SyncError::DuplicateItem { .. }
            | SyncError::UnknownItem { .. }
            | SyncError::UnknownColumn { .. }
            | SyncError::UnknownTask { .. }
            | SyncError::UnknownMutation { .. }
            | SyncError::DuplicateMutation { .. }
            | SyncError::InvariantViolation { .. } => ErrorSeverity::Critical,

            // Expected and recovered from
            SyncError::MutationRejected { .. } | SyncError::UnconfirmedCreate { .. } => {
                ErrorSeverity::Warning
            }

            SyncError::Api(_) | SyncError::Json(_) => ErrorSeverity::Error,
        }
    }
}
