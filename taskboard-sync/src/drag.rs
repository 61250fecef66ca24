//! Drag-and-drop entry point
//!
//! The rendering layer reports where a card was released; the controller
//! turns that into a move mutation, or into nothing when the gesture did not
//! really move the card.

use crate::api::BoardApi;
use crate::error::{Result, SyncError};
use crate::session::{BoardSession, DispatchOutcome};
use crate::store::BoardStore;
use crate::types::{ColumnId, TaskId};
use taskboard_config::DragConfig;
use tracing::debug;

/// Where a card was released
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTarget {
    pub column_id: ColumnId,
    /// Position in the target column's list, counted with the card removed
    pub index: usize,
}

/// A finished drag gesture
#[derive(Debug, Clone, PartialEq)]
pub struct DropGesture {
    pub task_id: TaskId,
    /// `None` when the card was released outside every column
    pub target: Option<DropTarget>,
    /// Pointer distance between press and release
    pub travel_px: f64,
}

/// Why a drop produced no mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropIgnored {
    Aborted,
    BelowThreshold,
    SamePosition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    Moved(DispatchOutcome),
    Ignored(DropIgnored),
}

pub struct DragController<A: BoardApi> {
    session: BoardSession<A>,
    config: DragConfig,
}

impl<A: BoardApi> DragController<A> {
    pub fn new(session: BoardSession<A>, config: DragConfig) -> Self {
        Self { session, config }
    }

    pub fn session(&self) -> &BoardSession<A> {
        &self.session
    }

    /// Handle a raw gesture, filtering out aborted drops and clicks
    pub async fn on_gesture(&self, gesture: DropGesture) -> Result<DropOutcome> {
        let Some(target) = gesture.target else {
            debug!("Drag of {} aborted", gesture.task_id);
            return Ok(DropOutcome::Ignored(DropIgnored::Aborted));
        };
        if gesture.travel_px < self.config.min_distance_px {
            debug!(
                "Drag of {} travelled {}px; treating as a click",
                gesture.task_id, gesture.travel_px
            );
            return Ok(DropOutcome::Ignored(DropIgnored::BelowThreshold));
        }
        self.on_drop(gesture.task_id, target.column_id, target.index)
            .await
    }

    /// Move `task_id` to `index` of `column_id`.
    ///
    /// The index is clamped to the column. Dropping a card where it already
    /// sits is a no-op.
    pub async fn on_drop(
        &self,
        task_id: TaskId,
        column_id: ColumnId,
        index: usize,
    ) -> Result<DropOutcome> {
        let resolved = self
            .session
            .read(|store| resolve_index(store, &task_id, &column_id, index))
            .await?;

        let Some(index) = resolved else {
            debug!("Drop of {} onto its own position", task_id);
            return Ok(DropOutcome::Ignored(DropIgnored::SamePosition));
        };

        let outcome = self.session.move_task(task_id, column_id, index).await?;
        Ok(DropOutcome::Moved(outcome))
    }
}

/// Clamp a drop index to the target column; `None` when nothing would move
fn resolve_index(
    store: &BoardStore,
    task_id: &TaskId,
    column_id: &ColumnId,
    index: usize,
) -> Result<Option<usize>> {
    let (origin_column, origin_index) = store
        .position_of(task_id)
        .ok_or_else(|| SyncError::unknown_task(task_id))?;
    let members = store
        .columns()
        .members(column_id)
        .ok_or_else(|| SyncError::unknown_column(column_id))?;

    if &origin_column == column_id {
        let index = index.min(members.len().saturating_sub(1));
        Ok((index != origin_index).then_some(index))
    } else {
        Ok(Some(index.min(members.len())))
    }
}
