//! Real-time channel event payloads
//!
//! Events arrive as JSON frames:
//!
//! ```json
//! {"type": "task:moved", "serverTimestamp": "2026-03-01T10:00:00Z",
//!  "clientMutationId": "01J...", "task": { ... }}
//! ```
//!
//! `clientMutationId` is only present when the event echoes a mutation that
//! was tagged by a client.

use super::board::Column;
use super::ids::{ClientMutationId, ColumnId, TaskId};
use super::mutation::{MutationTarget, ServerState};
use super::task::Task;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RemotePayload {
    #[serde(rename = "task:created")]
    TaskCreated { task: Task },
    #[serde(rename = "task:updated")]
    TaskUpdated { task: Task },
    #[serde(rename = "task:moved")]
    TaskMoved { task: Task },
    #[serde(rename = "task:deleted", rename_all = "camelCase")]
    TaskDeleted { task_id: TaskId },
    #[serde(rename = "column:created")]
    ColumnCreated { column: Column },
    #[serde(rename = "column:updated")]
    ColumnUpdated { column: Column },
    #[serde(rename = "column:deleted", rename_all = "camelCase")]
    ColumnDeleted { column_id: ColumnId },
}

impl RemotePayload {
    /// The wire name of this event
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::TaskCreated { .. } => "task:created",
            Self::TaskUpdated { .. } => "task:updated",
            Self::TaskMoved { .. } => "task:moved",
            Self::TaskDeleted { .. } => "task:deleted",
            Self::ColumnCreated { .. } => "column:created",
            Self::ColumnUpdated { .. } => "column:updated",
            Self::ColumnDeleted { .. } => "column:deleted",
        }
    }

    pub fn target(&self) -> MutationTarget {
        self.server_state().target()
    }

    /// The canonical state this event carries
    pub fn server_state(&self) -> ServerState {
        match self {
            Self::TaskCreated { task } | Self::TaskUpdated { task } | Self::TaskMoved { task } => {
                ServerState::Task(task.clone())
            }
            Self::TaskDeleted { task_id } => ServerState::TaskDeleted(task_id.clone()),
            Self::ColumnCreated { column } | Self::ColumnUpdated { column } => {
                ServerState::Column(column.clone())
            }
            Self::ColumnDeleted { column_id } => ServerState::ColumnDeleted(column_id.clone()),
        }
    }
}

/// A notification from the real-time channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEvent {
    #[serde(flatten)]
    pub payload: RemotePayload,
    pub server_timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_mutation_id: Option<ClientMutationId>,
}

impl RemoteEvent {
    pub fn new(payload: RemotePayload, server_timestamp: DateTime<Utc>) -> Self {
        Self {
            payload,
            server_timestamp,
            client_mutation_id: None,
        }
    }

    /// Mark this event as the echo of a tagged client mutation
    pub fn echoing(mut self, id: ClientMutationId) -> Self {
        self.client_mutation_id = Some(id);
        self
    }

    /// Parse one JSON frame from the channel
    pub fn from_json(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }

    pub fn target(&self) -> MutationTarget {
        self.payload.target()
    }
}
