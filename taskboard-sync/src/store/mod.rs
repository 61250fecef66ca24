//! Normalized board storage.
//!
//! [`BoardStore`] pairs a [`ColumnStore`] (columns, their order, and each
//! column's ordered task ids) with a [`TaskStore`] (task records by id) and
//! keeps them consistent:
//!
//! - every task is listed in exactly one column, the one its `column_id` names
//! - task and column `order` values equal their dense rank
//! - no column lists a task id absent from the task store
//!
//! Only the reconciler and the store's own methods mutate; rendering reads
//! through the selectors.

mod column_store;
mod listener;
mod task_store;

pub use column_store::ColumnStore;
pub use listener::{BoardEvent, BoardListener};
pub use task_store::TaskStore;

use crate::error::{Result, SyncError};
use crate::types::{BoardView, Column, ColumnId, ColumnView, ProjectId, Task, TaskId};
use std::fmt;
use std::sync::Arc;

/// A column removed from the board together with its tasks, in order
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedColumn {
    pub column: Column,
    pub tasks: Vec<Task>,
}

/// One board's columns and tasks
pub struct BoardStore {
    project_id: ProjectId,
    columns: ColumnStore,
    tasks: TaskStore,
    listeners: Vec<Arc<dyn BoardListener>>,
}

impl fmt::Debug for BoardStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardStore")
            .field("project_id", &self.project_id)
            .field("columns", &self.columns)
            .field("tasks", &self.tasks)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl BoardStore {
    /// An empty board
    pub fn new(project_id: impl Into<ProjectId>) -> Self {
        Self {
            project_id: project_id.into(),
            columns: ColumnStore::new(),
            tasks: TaskStore::new(),
            listeners: Vec::new(),
        }
    }

    /// Build a board from a full fetch. Orders are normalized to dense ranks.
    pub fn hydrate(
        project_id: impl Into<ProjectId>,
        columns: Vec<Column>,
        tasks: Vec<Task>,
    ) -> Result<Self> {
        let (columns, tasks) = Self::build(columns, tasks)?;
        Ok(Self {
            project_id: project_id.into(),
            columns,
            tasks,
            listeners: Vec::new(),
        })
    }

    /// Replace all state with a fresh fetch. On error the board is unchanged.
    pub fn resync(&mut self, columns: Vec<Column>, tasks: Vec<Task>) -> Result<()> {
        let (columns, tasks) = Self::build(columns, tasks)?;
        self.columns = columns;
        self.tasks = tasks;
        self.emit(&BoardEvent::Reset);
        Ok(())
    }

    fn build(mut columns: Vec<Column>, mut tasks: Vec<Task>) -> Result<(ColumnStore, TaskStore)> {
        columns.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        let mut column_store = ColumnStore::new();
        for (rank, mut column) in columns.into_iter().enumerate() {
            if column_store.contains(&column.id) {
                return Err(SyncError::duplicate_item(&column.id));
            }
            column.order = rank;
            column_store.upsert(column)?;
        }

        tasks.sort_by(|a, b| {
            a.column_id
                .cmp(&b.column_id)
                .then_with(|| a.order.cmp(&b.order))
                .then_with(|| a.id.cmp(&b.id))
        });
        let mut task_store = TaskStore::new();
        for mut task in tasks {
            if task_store.contains(&task.id) {
                return Err(SyncError::duplicate_item(&task.id));
            }
            let members = column_store.members_mut(&task.column_id)?;
            task.order = members.insert_at(task.id.clone(), members.len())?;
            task_store.insert(task);
        }
        Ok((column_store, task_store))
    }

    /// Register a change listener
    pub fn add_listener(&mut self, listener: Arc<dyn BoardListener>) {
        self.listeners.push(listener);
    }

    fn emit(&self, event: &BoardEvent) {
        for listener in &self.listeners {
            listener.on_board_event(event);
        }
    }

    // =========================================================================
    // Selectors
    // =========================================================================

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    pub fn columns(&self) -> &ColumnStore {
        &self.columns
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.get(id)
    }

    /// Columns in board order
    pub fn columns_ordered(&self) -> Vec<&Column> {
        self.columns.iter_ordered().collect()
    }

    /// A column's tasks in display order; empty for unknown columns
    pub fn tasks_for_column(&self, id: &ColumnId) -> Vec<&Task> {
        self.columns
            .members(id)
            .map(|list| list.iter().filter_map(|t| self.tasks.get(t)).collect())
            .unwrap_or_default()
    }

    /// A column's task ids in display order
    pub fn task_ids(&self, id: &ColumnId) -> Vec<TaskId> {
        self.columns
            .members(id)
            .map(|list| list.to_vec())
            .unwrap_or_default()
    }

    /// Column and rank of a task
    pub fn position_of(&self, id: &TaskId) -> Option<(ColumnId, usize)> {
        let column_id = self.tasks.column_of(id)?;
        let rank = self.columns.members(column_id)?.rank(id)?;
        Some((column_id.clone(), rank))
    }

    /// Render-ready copy of the whole board
    pub fn view(&self) -> BoardView {
        BoardView {
            project_id: self.project_id.clone(),
            columns: self
                .columns
                .iter_ordered()
                .map(|column| ColumnView {
                    column: column.clone(),
                    tasks: self
                        .tasks_for_column(&column.id)
                        .into_iter()
                        .cloned()
                        .collect(),
                })
                .collect(),
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert or replace a task, placing it at `task.order` in `task.column_id`.
    ///
    /// A task that changes column is removed from its old column's list before
    /// it is inserted in the new one.
    pub fn upsert_task(&mut self, task: Task) -> Result<()> {
        if !self.columns.contains(&task.column_id) {
            return Err(SyncError::unknown_column(&task.column_id));
        }

        match self.tasks.column_of(&task.id).cloned() {
            Some(previous) if previous == task.column_id => {
                self.columns
                    .members_mut(&previous)?
                    .move_to(&task.id, task.order)?;
            }
            Some(previous) => {
                let target = self.columns.members_mut(&task.column_id)?;
                if target.contains(&task.id) {
                    return Err(SyncError::duplicate_item(&task.id));
                }
                target.insert_at(task.id.clone(), task.order)?;
                self.columns.members_mut(&previous)?.remove(&task.id);
                self.reindex_tasks(&previous);
            }
            None => {
                self.columns
                    .members_mut(&task.column_id)?
                    .insert_at(task.id.clone(), task.order)?;
            }
        }

        let id = task.id.clone();
        let column_id = task.column_id.clone();
        self.tasks.insert(task);
        self.reindex_tasks(&column_id);

        if let Some(task) = self.tasks.get(&id) {
            self.emit(&BoardEvent::TaskUpserted(task.clone()));
        }
        Ok(())
    }

    /// Remove a task from its column and from the task store. Idempotent.
    pub fn remove_task(&mut self, id: &TaskId) -> Option<Task> {
        let task = self.tasks.get(id)?.clone();
        self.emit(&BoardEvent::TaskRemoved(task.clone()));

        if let Ok(members) = self.columns.members_mut(&task.column_id) {
            members.remove(id);
        }
        self.tasks.remove(id);
        self.reindex_tasks(&task.column_id);
        Some(task)
    }

    /// Insert a column at `column.order`, or update and reposition an existing one
    pub fn upsert_column(&mut self, column: Column) -> Result<()> {
        let id = column.id.clone();
        self.columns.upsert(column)?;
        if let Some(column) = self.columns.get(&id) {
            self.emit(&BoardEvent::ColumnUpserted(column.clone()));
        }
        Ok(())
    }

    /// Remove a column and every task in it. Idempotent.
    ///
    /// Listeners see each task removal and then the column removal before any
    /// record is dropped.
    pub fn remove_column(&mut self, id: &ColumnId) -> Option<RemovedColumn> {
        let column = self.columns.get(id)?.clone();
        let tasks: Vec<Task> = self
            .tasks_for_column(id)
            .into_iter()
            .cloned()
            .collect();

        for task in &tasks {
            self.emit(&BoardEvent::TaskRemoved(task.clone()));
        }
        self.emit(&BoardEvent::ColumnRemoved(column.clone()));

        self.columns.remove(id);
        for task in &tasks {
            self.tasks.remove(&task.id);
        }
        Some(RemovedColumn { column, tasks })
    }

    /// Put a removed column and its tasks back where they were
    pub fn restore_column(&mut self, removed: RemovedColumn) -> Result<()> {
        self.upsert_column(removed.column)?;
        for task in removed.tasks {
            self.upsert_task(task)?;
        }
        Ok(())
    }

    /// Replace a column's temporary id with the server-assigned column
    pub fn rekey_column(&mut self, old: &ColumnId, column: Column) -> Result<()> {
        let new_id = column.id.clone();
        self.columns.rekey(old, column)?;
        for task_id in self.task_ids(&new_id) {
            if let Some(task) = self.tasks.get_mut(&task_id) {
                task.column_id = new_id.clone();
            }
        }
        if let Some(column) = self.columns.get(&new_id) {
            self.emit(&BoardEvent::ColumnRekeyed {
                from: old.clone(),
                to: column.clone(),
            });
        }
        Ok(())
    }

    fn reindex_tasks(&mut self, column_id: &ColumnId) {
        if let Some(members) = self.columns.members(column_id) {
            for (rank, id) in members.iter().enumerate() {
                if let Some(task) = self.tasks.get_mut(id) {
                    task.order = rank;
                }
            }
        }
    }

    // =========================================================================
    // Consistency
    // =========================================================================

    /// Check membership, density and referential integrity
    pub fn verify_invariants(&self) -> Result<()> {
        let ordered = self.columns.ordered_ids();
        if ordered.len() != self.columns.len() {
            return Err(SyncError::invariant(format!(
                "{} columns stored but {} ranked",
                self.columns.len(),
                ordered.len()
            )));
        }

        let mut listed = 0usize;
        for (rank, column_id) in ordered.iter().enumerate() {
            let column = self.columns.get(column_id).ok_or_else(|| {
                SyncError::invariant(format!("column {} is ranked but missing", column_id))
            })?;
            if column.order != rank {
                return Err(SyncError::invariant(format!(
                    "column {} has order {} at rank {}",
                    column_id, column.order, rank
                )));
            }

            let members = self.columns.members(column_id).ok_or_else(|| {
                SyncError::invariant(format!("column {} has no task list", column_id))
            })?;
            for (position, task_id) in members.iter().enumerate() {
                let task = self.tasks.get(task_id).ok_or_else(|| {
                    SyncError::invariant(format!(
                        "column {} references missing task {}",
                        column_id, task_id
                    ))
                })?;
                if &task.column_id != column_id {
                    return Err(SyncError::invariant(format!(
                        "task {} is listed in column {} but belongs to {}",
                        task_id, column_id, task.column_id
                    )));
                }
                if task.order != position {
                    return Err(SyncError::invariant(format!(
                        "task {} has order {} at rank {}",
                        task_id, task.order, position
                    )));
                }
                listed += 1;
            }
        }

        if listed != self.tasks.len() {
            let orphan = self
                .tasks
                .iter()
                .find(|t| {
                    self.columns
                        .members(&t.column_id)
                        .map(|m| !m.contains(&t.id))
                        .unwrap_or(true)
                })
                .map(|t| t.id.to_string())
                .unwrap_or_default();
            return Err(SyncError::invariant(format!(
                "{} tasks stored but {} listed (orphan: {})",
                self.tasks.len(),
                listed,
                orphan
            )));
        }
        Ok(())
    }
}
