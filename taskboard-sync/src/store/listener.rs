//! Change notifications for UI hooks

use crate::types::{Column, ColumnId, Task};

/// A structural change to the board
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    TaskUpserted(Task),
    /// Emitted before the record is dropped
    TaskRemoved(Task),
    ColumnUpserted(Column),
    /// Emitted after the column's task removals, before the column is dropped
    ColumnRemoved(Column),
    /// A column's temporary id was replaced by the server's
    ColumnRekeyed { from: ColumnId, to: Column },
    /// The whole board was replaced (hydrate/resync)
    Reset,
}

/// Receives board change notifications.
///
/// Listeners are called synchronously from inside store mutations and must not
/// try to mutate the board.
pub trait BoardListener: Send + Sync {
    fn on_board_event(&self, event: &BoardEvent);
}

impl<F> BoardListener for F
where
    F: Fn(&BoardEvent) + Send + Sync,
{
    fn on_board_event(&self, event: &BoardEvent) {
        self(event)
    }
}
