//! Columns, their order on the board, and each column's ordered task ids

use crate::error::{Result, SyncError};
use crate::ordered_list::OrderedList;
use crate::types::{Column, ColumnId, TaskId};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ColumnStore {
    columns: HashMap<ColumnId, Column>,
    order: OrderedList<ColumnId>,
    members: HashMap<ColumnId, OrderedList<TaskId>>,
}

impl ColumnStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.get(id)
    }

    pub fn contains(&self, id: &ColumnId) -> bool {
        self.columns.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column ids in board order
    pub fn ordered_ids(&self) -> &OrderedList<ColumnId> {
        &self.order
    }

    /// Task ids of a column in display order
    pub fn members(&self, id: &ColumnId) -> Option<&OrderedList<TaskId>> {
        self.members.get(id)
    }

    pub(crate) fn members_mut(&mut self, id: &ColumnId) -> Result<&mut OrderedList<TaskId>> {
        self.members
            .get_mut(id)
            .ok_or_else(|| SyncError::unknown_column(id))
    }

    /// Insert a new column at `column.order`, or update an existing one in place
    /// and move it if its order changed. Returns the rank used.
    pub(crate) fn upsert(&mut self, column: Column) -> Result<usize> {
        let rank = if self.order.contains(&column.id) {
            self.order.move_to(&column.id, column.order)?
        } else {
            let rank = self.order.insert_at(column.id.clone(), column.order)?;
            self.members.insert(column.id.clone(), OrderedList::new());
            rank
        };
        self.columns.insert(column.id.clone(), column);
        self.reindex();
        Ok(rank)
    }

    /// Remove a column, returning it with its member ids in order
    pub(crate) fn remove(&mut self, id: &ColumnId) -> Option<(Column, Vec<TaskId>)> {
        let column = self.columns.remove(id)?;
        self.order.remove(id);
        let members = self
            .members
            .remove(id)
            .map(|list| list.to_vec())
            .unwrap_or_default();
        self.reindex();
        Some((column, members))
    }

    /// Swap a column's id for a server-assigned one, keeping rank and members
    pub(crate) fn rekey(&mut self, old: &ColumnId, column: Column) -> Result<()> {
        if !self.columns.contains_key(old) {
            return Err(SyncError::unknown_column(old));
        }
        if old != &column.id && self.columns.contains_key(&column.id) {
            return Err(SyncError::duplicate_item(&column.id));
        }
        self.columns.remove(old);
        self.order.replace(old, column.id.clone())?;
        let members = self.members.remove(old).unwrap_or_default();
        self.members.insert(column.id.clone(), members);
        let target_order = column.order;
        let id = column.id.clone();
        self.columns.insert(id.clone(), column);
        self.order.move_to(&id, target_order)?;
        self.reindex();
        Ok(())
    }

    /// Columns in board order
    pub fn iter_ordered(&self) -> impl Iterator<Item = &Column> {
        self.order.iter().filter_map(|id| self.columns.get(id))
    }

    fn reindex(&mut self) {
        for (rank, id) in self.order.iter().enumerate() {
            if let Some(column) = self.columns.get_mut(id) {
                column.order = rank;
            }
        }
    }
}
