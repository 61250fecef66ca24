//! Test helpers: board fixtures and an in-memory board server
//!
//! Enabled by the `test-support` feature so integration tests under `tests/`
//! can drive a [`BoardSession`](crate::BoardSession) without a network.

use crate::api::{ApiError, BoardApi, BoardSnapshot};
use crate::store::BoardStore;
use crate::types::{
    BoardView, ClientMutationId, Column, ColumnId, ProjectId, RemoteEvent, RemotePayload, Task,
    TaskId,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

/// Project id used by [`board`]
pub const PROJECT: &str = "p1";

/// Build a snapshot from `(column, [task, ...])` pairs in board order.
///
/// Column names and task titles are the upper-cased ids.
pub fn board(layout: &[(&str, &[&str])]) -> BoardSnapshot {
    let mut snapshot = BoardSnapshot::default();
    for (column_order, (column, tasks)) in layout.iter().enumerate() {
        snapshot.columns.push(Column::new(
            *column,
            PROJECT,
            column.to_uppercase(),
            column_order,
        ));
        for (order, task) in tasks.iter().enumerate() {
            snapshot
                .tasks
                .push(Task::new(*task, PROJECT, *column, order, task.to_uppercase()));
        }
    }
    snapshot
}

#[derive(Debug)]
struct ServerBoard {
    store: BoardStore,
    next_id: u64,
    failures: VecDeque<ApiError>,
    calls: Vec<String>,
    events: Vec<RemoteEvent>,
}

/// In-memory board server.
///
/// Applies requests to its own [`BoardStore`], assigns ids (`task-1`,
/// `column-1`, ...), stamps `updated_at`, and records the real-time event each
/// change would broadcast. Failures are scripted with [`fail_next`]; requests
/// can be held in flight with [`pause`].
///
/// [`fail_next`]: ScriptedBoardApi::fail_next
/// [`pause`]: ScriptedBoardApi::pause
#[derive(Debug)]
pub struct ScriptedBoardApi {
    board: Mutex<ServerBoard>,
    gate: watch::Sender<bool>,
}

impl ScriptedBoardApi {
    pub fn new(snapshot: BoardSnapshot) -> crate::Result<Self> {
        let store = BoardStore::hydrate(PROJECT, snapshot.columns, snapshot.tasks)?;
        let (gate, _) = watch::channel(false);
        Ok(Self {
            board: Mutex::new(ServerBoard {
                store,
                next_id: 1,
                failures: VecDeque::new(),
                calls: Vec::new(),
                events: Vec::new(),
            }),
            gate,
        })
    }

    fn lock(&self) -> MutexGuard<'_, ServerBoard> {
        match self.board.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Scripted board lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Fail the next mutating request with `error`
    pub fn fail_next(&self, error: ApiError) {
        self.lock().failures.push_back(error);
    }

    /// Hold every request until [`resume`](Self::resume)
    pub fn pause(&self) {
        self.gate.send_replace(true);
    }

    pub fn resume(&self) {
        self.gate.send_replace(false);
    }

    /// Requests received so far, e.g. `"move_task t1 -> b@1"`
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Events the server would have broadcast, oldest first
    pub fn events(&self) -> Vec<RemoteEvent> {
        self.lock().events.clone()
    }

    /// The server's copy of the board
    pub fn server_view(&self) -> BoardView {
        self.lock().store.view()
    }

    /// Change the server's board directly, as a collaborator would, and
    /// return the event it broadcasts
    pub fn collaborator_move(
        &self,
        task_id: &str,
        column_id: &str,
        order: usize,
    ) -> crate::Result<RemoteEvent> {
        let mut board = self.lock();
        let mut task = board
            .store
            .task(&task_id.into())
            .cloned()
            .ok_or_else(|| crate::SyncError::unknown_task(task_id))?;
        task.column_id = column_id.into();
        task.order = order;
        task.updated_at = Some(Utc::now());
        board.store.upsert_task(task.clone())?;
        let task = board.store.task(&task.id).cloned().unwrap_or(task);
        Ok(Self::broadcast(
            &mut board,
            RemotePayload::TaskMoved { task },
            None,
        ))
    }

    /// Add a column on the server as a collaborator would, returning the
    /// event it broadcasts
    pub fn collaborator_add_column(
        &self,
        column_id: &str,
        order: usize,
    ) -> crate::Result<RemoteEvent> {
        let mut board = self.lock();
        let column = Column::new(column_id, PROJECT, column_id.to_uppercase(), order);
        board.store.upsert_column(column.clone())?;
        let column = board.store.column(&column.id).cloned().unwrap_or(column);
        Ok(Self::broadcast(
            &mut board,
            RemotePayload::ColumnCreated { column },
            None,
        ))
    }

    async fn admit(&self, call: String) -> Result<(), ApiError> {
        self.lock().calls.push(call);

        let mut gate = self.gate.subscribe();
        loop {
            let paused = *gate.borrow_and_update();
            if !paused || gate.changed().await.is_err() {
                break;
            }
        }

        match self.lock().failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn broadcast(
        board: &mut ServerBoard,
        payload: RemotePayload,
        client_mutation_id: Option<ClientMutationId>,
    ) -> RemoteEvent {
        let mut event = RemoteEvent::new(payload, Utc::now());
        event.client_mutation_id = client_mutation_id;
        board.events.push(event.clone());
        event
    }

    fn stored_task(board: &ServerBoard, id: &TaskId) -> Result<Task, ApiError> {
        board
            .store
            .task(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("task {}", id)))
    }

    fn stored_column(board: &ServerBoard, id: &ColumnId) -> Result<Column, ApiError> {
        board
            .store
            .column(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("column {}", id)))
    }

    fn write_task(board: &mut ServerBoard, mut task: Task) -> Result<Task, ApiError> {
        task.updated_at = Some(Utc::now());
        board
            .store
            .upsert_task(task.clone())
            .map_err(|e| ApiError::Conflict(e.to_string()))?;
        Self::stored_task(board, &task.id)
    }

    fn write_column(board: &mut ServerBoard, column: Column) -> Result<Column, ApiError> {
        board
            .store
            .upsert_column(column.clone())
            .map_err(|e| ApiError::Conflict(e.to_string()))?;
        Self::stored_column(board, &column.id)
    }

    fn assign_id(board: &mut ServerBoard, prefix: &str) -> String {
        let id = format!("{}-{}", prefix, board.next_id);
        board.next_id += 1;
        id
    }
}

#[async_trait]
impl BoardApi for ScriptedBoardApi {
    async fn fetch_board(&self, project_id: &ProjectId) -> Result<BoardSnapshot, ApiError> {
        self.lock().calls.push(format!("fetch_board {}", project_id));
        let board = self.lock();
        let mut snapshot = BoardSnapshot::default();
        for column in board.store.columns_ordered() {
            snapshot.columns.push(column.clone());
            snapshot.tasks.extend(
                board
                    .store
                    .tasks_for_column(&column.id)
                    .into_iter()
                    .cloned(),
            );
        }
        Ok(snapshot)
    }

    async fn move_task(
        &self,
        _project_id: &ProjectId,
        task_id: &TaskId,
        column_id: &ColumnId,
        order: usize,
        client_mutation_id: ClientMutationId,
    ) -> Result<Task, ApiError> {
        self.admit(format!("move_task {} -> {}@{}", task_id, column_id, order))
            .await?;
        let mut board = self.lock();
        let mut task = Self::stored_task(&board, task_id)?;
        Self::stored_column(&board, column_id)?;
        task.column_id = column_id.clone();
        task.order = order;
        let task = Self::write_task(&mut board, task)?;
        Self::broadcast(
            &mut board,
            RemotePayload::TaskMoved { task: task.clone() },
            Some(client_mutation_id),
        );
        Ok(task)
    }

    async fn create_task(
        &self,
        _project_id: &ProjectId,
        task: &Task,
        client_mutation_id: ClientMutationId,
    ) -> Result<Task, ApiError> {
        self.admit(format!("create_task {}", task.title)).await?;
        let mut board = self.lock();
        Self::stored_column(&board, &task.column_id)?;
        let mut created = task.clone();
        created.id = Self::assign_id(&mut board, "task").into();
        let created = Self::write_task(&mut board, created)?;
        Self::broadcast(
            &mut board,
            RemotePayload::TaskCreated {
                task: created.clone(),
            },
            Some(client_mutation_id),
        );
        Ok(created)
    }

    async fn update_task(
        &self,
        _project_id: &ProjectId,
        task: &Task,
        client_mutation_id: ClientMutationId,
    ) -> Result<Task, ApiError> {
        self.admit(format!("update_task {}", task.id)).await?;
        let mut board = self.lock();
        // Updates leave the task where the server has it
        let stored = Self::stored_task(&board, &task.id)?;
        let mut updated = task.clone();
        updated.column_id = stored.column_id;
        updated.order = stored.order;
        let updated = Self::write_task(&mut board, updated)?;
        Self::broadcast(
            &mut board,
            RemotePayload::TaskUpdated {
                task: updated.clone(),
            },
            Some(client_mutation_id),
        );
        Ok(updated)
    }

    async fn delete_task(
        &self,
        _project_id: &ProjectId,
        task_id: &TaskId,
        client_mutation_id: ClientMutationId,
    ) -> Result<(), ApiError> {
        self.admit(format!("delete_task {}", task_id)).await?;
        let mut board = self.lock();
        board
            .store
            .remove_task(task_id)
            .ok_or_else(|| ApiError::NotFound(format!("task {}", task_id)))?;
        Self::broadcast(
            &mut board,
            RemotePayload::TaskDeleted {
                task_id: task_id.clone(),
            },
            Some(client_mutation_id),
        );
        Ok(())
    }

    async fn create_column(
        &self,
        _project_id: &ProjectId,
        column: &Column,
        client_mutation_id: ClientMutationId,
    ) -> Result<Column, ApiError> {
        self.admit(format!("create_column {}", column.name)).await?;
        let mut board = self.lock();
        let mut created = column.clone();
        created.id = Self::assign_id(&mut board, "column").into();
        let created = Self::write_column(&mut board, created)?;
        Self::broadcast(
            &mut board,
            RemotePayload::ColumnCreated {
                column: created.clone(),
            },
            Some(client_mutation_id),
        );
        Ok(created)
    }

    async fn update_column(
        &self,
        _project_id: &ProjectId,
        column: &Column,
        client_mutation_id: ClientMutationId,
    ) -> Result<Column, ApiError> {
        self.admit(format!("update_column {}", column.id)).await?;
        let mut board = self.lock();
        Self::stored_column(&board, &column.id)?;
        let updated = Self::write_column(&mut board, column.clone())?;
        Self::broadcast(
            &mut board,
            RemotePayload::ColumnUpdated {
                column: updated.clone(),
            },
            Some(client_mutation_id),
        );
        Ok(updated)
    }

    async fn delete_column(
        &self,
        _project_id: &ProjectId,
        column_id: &ColumnId,
        client_mutation_id: ClientMutationId,
    ) -> Result<(), ApiError> {
        self.admit(format!("delete_column {}", column_id)).await?;
        let mut board = self.lock();
        board
            .store
            .remove_column(column_id)
            .ok_or_else(|| ApiError::NotFound(format!("column {}", column_id)))?;
        Self::broadcast(
            &mut board,
            RemotePayload::ColumnDeleted {
                column_id: column_id.clone(),
            },
            Some(client_mutation_id),
        );
        Ok(())
    }
}
