//! One open board: its reconciler plus the API it talks to

use crate::api::{self, ApiError, BoardApi};
use crate::error::{Result, SyncError};
use crate::reconciler::{
    AuthoritativeOutcome, IgnoreReason, MutationReconciler, MutationState, RejectOutcome,
    RemoteOutcome,
};
use crate::store::{BoardListener, BoardStore};
use crate::types::{
    BoardView, ClientMutationId, Column, ColumnId, Mutation, PendingMutation, ProjectId,
    RemoteEvent, ServerState, Task, TaskId,
};
use std::sync::Arc;
use taskboard_common::{ErrorSeverity, Severity};
use taskboard_config::SyncConfig;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

/// How a dispatched mutation ended, when it did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The server accepted it; this is its canonical result
    Confirmed(ServerState),
    /// A later local gesture or a remote change replaced it before it resolved
    Discarded,
}

/// A board opened for editing.
///
/// Cloning is cheap; clones share the same reconciler. The lock is never held
/// across a request.
pub struct BoardSession<A: BoardApi> {
    project_id: ProjectId,
    api: Arc<A>,
    reconciler: Arc<Mutex<MutationReconciler>>,
}

impl<A: BoardApi> Clone for BoardSession<A> {
    fn clone(&self) -> Self {
        Self {
            project_id: self.project_id.clone(),
            api: Arc::clone(&self.api),
            reconciler: Arc::clone(&self.reconciler),
        }
    }
}

impl<A: BoardApi> BoardSession<A> {
    /// Fetch a board and hydrate the store from it
    pub async fn open(api: Arc<A>, project_id: ProjectId, config: &SyncConfig) -> Result<Self> {
        let snapshot = api.fetch_board(&project_id).await?;
        let (columns, tasks) = (snapshot.columns.len(), snapshot.tasks.len());
        let store = BoardStore::hydrate(project_id.clone(), snapshot.columns, snapshot.tasks)?;
        info!(
            "Opened board {} with {} columns and {} tasks",
            project_id, columns, tasks
        );

        Ok(Self {
            project_id,
            api,
            reconciler: Arc::new(Mutex::new(MutationReconciler::new(
                store,
                config.reconciler.clone(),
            ))),
        })
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    /// Run a selector against the store
    pub async fn read<R>(&self, f: impl FnOnce(&BoardStore) -> R) -> R {
        let reconciler = self.reconciler.lock().await;
        f(reconciler.store())
    }

    pub async fn view(&self) -> BoardView {
        self.read(BoardStore::view).await
    }

    pub async fn state(&self, id: &ClientMutationId) -> Option<MutationState> {
        self.reconciler.lock().await.state(id)
    }

    pub async fn add_listener(&self, listener: Arc<dyn BoardListener>) {
        self.reconciler.lock().await.add_listener(listener);
    }

    // =========================================================================
    // Local mutations
    // =========================================================================

    /// Tag a mutation and run it through [`submit`](Self::submit)
    pub async fn dispatch(&self, mutation: Mutation) -> Result<DispatchOutcome> {
        self.submit(PendingMutation::new(mutation)).await
    }

    /// Apply optimistically, send the request, then confirm or roll back.
    ///
    /// A rolled-back mutation is returned as [`SyncError::MutationRejected`].
    /// A response the store cannot absorb is returned as is, after the board
    /// has been refetched.
    pub async fn submit(&self, pending: PendingMutation) -> Result<DispatchOutcome> {
        let id = pending.client_mutation_id;

        self.reconciler
            .lock()
            .await
            .apply_optimistic(pending.clone())?;

        let response = api::submit(self.api.as_ref(), &self.project_id, &pending).await;
        let result = self.resolve(&pending, response).await;

        if let Err(e) = &result {
            if e.severity() == ErrorSeverity::Critical {
                warn!("Response for {} could not be applied ({}); resyncing", id, e);
                if let Err(resync_error) = self.resync().await {
                    error!("Resync of {} failed: {}", self.project_id, resync_error);
                }
            }
        }
        result
    }

    async fn resolve(
        &self,
        pending: &PendingMutation,
        response: std::result::Result<ServerState, ApiError>,
    ) -> Result<DispatchOutcome> {
        let id = pending.client_mutation_id;
        let mut reconciler = self.reconciler.lock().await;
        match response {
            Ok(state) => match reconciler.apply_authoritative(id, state.clone())? {
                AuthoritativeOutcome::Ignored(IgnoreReason::Stale) => Ok(DispatchOutcome::Discarded),
                _ => Ok(DispatchOutcome::Confirmed(state)),
            },
            Err(api_error) => match reconciler.reject_optimistic(id, &api_error)? {
                RejectOutcome::RolledBack { .. } => Err(SyncError::MutationRejected {
                    client_mutation_id: id,
                    kind: pending.kind(),
                    target: pending.target(),
                    reason: api_error.to_string(),
                }),
                RejectOutcome::Ignored(_) => {
                    debug!("Request for {} failed after it was superseded", id);
                    Ok(DispatchOutcome::Discarded)
                }
            },
        }
    }

    pub async fn move_task(
        &self,
        task_id: TaskId,
        column_id: ColumnId,
        index: usize,
    ) -> Result<DispatchOutcome> {
        self.dispatch(Mutation::MoveTask {
            task_id,
            column_id,
            index,
        })
        .await
    }

    pub async fn create_task(&self, task: Task) -> Result<DispatchOutcome> {
        self.dispatch(Mutation::CreateTask { task }).await
    }

    pub async fn update_task(&self, task: Task) -> Result<DispatchOutcome> {
        self.dispatch(Mutation::UpdateTask { task }).await
    }

    pub async fn delete_task(&self, task_id: TaskId) -> Result<DispatchOutcome> {
        self.dispatch(Mutation::DeleteTask { task_id }).await
    }

    pub async fn create_column(&self, column: Column) -> Result<DispatchOutcome> {
        self.dispatch(Mutation::CreateColumn { column }).await
    }

    pub async fn update_column(&self, column: Column) -> Result<DispatchOutcome> {
        self.dispatch(Mutation::UpdateColumn { column }).await
    }

    pub async fn delete_column(&self, column_id: ColumnId) -> Result<DispatchOutcome> {
        self.dispatch(Mutation::DeleteColumn { column_id }).await
    }

    // =========================================================================
    // Remote events
    // =========================================================================

    pub async fn handle_remote(&self, event: RemoteEvent) -> Result<RemoteOutcome> {
        self.reconciler.lock().await.apply_remote(event)
    }

    /// Parse and apply one JSON frame from the real-time channel
    pub async fn handle_frame(&self, frame: &str) -> Result<RemoteOutcome> {
        let event = RemoteEvent::from_json(frame)?;
        self.handle_remote(event).await
    }

    /// Apply events until the channel closes.
    ///
    /// An event the store cannot absorb means the client has drifted from the
    /// server, so the board is refetched. Other failures are logged and the
    /// loop continues.
    pub async fn run_remote_events(&self, mut events: mpsc::Receiver<RemoteEvent>) -> Result<()> {
        while let Some(event) = events.recv().await {
            let name = event.payload.event_name();
            match self.handle_remote(event).await {
                Ok(outcome) => debug!("Remote {}: {:?}", name, outcome),
                Err(e) if e.severity() == ErrorSeverity::Critical => {
                    warn!("Remote {} could not be applied ({}); resyncing", name, e);
                    if let Err(resync_error) = self.resync().await {
                        error!("Resync of {} failed: {}", self.project_id, resync_error);
                        return Err(resync_error);
                    }
                }
                Err(e) => warn!("Remote {} failed: {}", name, e),
            }
        }
        info!("Real-time channel for {} closed", self.project_id);
        Ok(())
    }

    /// Refetch the board, keeping pending local mutations applied on top
    pub async fn resync(&self) -> Result<()> {
        let snapshot = self.api.fetch_board(&self.project_id).await?;
        self.reconciler
            .lock()
            .await
            .resync(snapshot.columns, snapshot.tasks)
    }
}

#[cfg(all(test, feature = "test-support"))]
mod tests {
    use super::*;
    use crate::test_support::{board, ScriptedBoardApi, PROJECT};
    use crate::types::MutationKind;
    use tokio_test::block_on;

    fn open(api: Arc<ScriptedBoardApi>) -> BoardSession<ScriptedBoardApi> {
        block_on(BoardSession::open(
            api,
            PROJECT.into(),
            &SyncConfig::default(),
        ))
        .unwrap()
    }

    #[test]
    fn test_open_hydrates_from_fetch() {
        let api = Arc::new(ScriptedBoardApi::new(board(&[("a", &["t1"]), ("b", &[])])).unwrap());
        let session = open(api);
        let layout = block_on(session.view()).layout();
        assert_eq!(layout.len(), 2);
        assert_eq!(layout[0].1, vec!["t1"]);
    }

    #[test]
    fn test_rejected_delete_restores_task() {
        let api = Arc::new(ScriptedBoardApi::new(board(&[("a", &["t1", "t2"])])).unwrap());
        let session = open(api.clone());
        api.fail_next(ApiError::Network("offline".into()));

        let err = block_on(session.delete_task("t1".into())).unwrap_err();
        assert!(matches!(
            err,
            SyncError::MutationRejected {
                kind: MutationKind::Delete,
                ..
            }
        ));
        let restored = block_on(session.read(|s| s.position_of(&"t1".into())));
        assert_eq!(restored, Some(("a".into(), 0)));
    }

    #[test]
    fn test_confirmed_update_returns_server_state() {
        let api = Arc::new(ScriptedBoardApi::new(board(&[("a", &["t1"])])).unwrap());
        let session = open(api);
        let mut task = block_on(session.read(|s| s.task(&"t1".into()).cloned())).unwrap();
        task.title = "Ship it".into();

        match block_on(session.update_task(task)).unwrap() {
            DispatchOutcome::Confirmed(ServerState::Task(updated)) => {
                assert_eq!(updated.title, "Ship it");
                assert!(updated.updated_at.is_some());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
