//! Board-mutation API client contract

use crate::types::{
    ClientMutationId, Column, ColumnId, Mutation, PendingMutation, ProjectId, ServerState, Task,
    TaskId,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a board request failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never got an answer
    #[error("network error: {0}")]
    Network(String),

    /// The server's copy changed underneath the request
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
}

/// Everything on one board, as fetched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub columns: Vec<Column>,
    pub tasks: Vec<Task>,
}

/// The board REST API
///
/// Every mutating call carries the client mutation id so the server can tag
/// the real-time event it emits for the change.
#[async_trait]
pub trait BoardApi: Send + Sync {
    /// Load all columns and tasks of a project
    async fn fetch_board(&self, project_id: &ProjectId) -> Result<BoardSnapshot, ApiError>;

    /// Place a task at `order` within `column_id`
    async fn move_task(
        &self,
        project_id: &ProjectId,
        task_id: &TaskId,
        column_id: &ColumnId,
        order: usize,
        client_mutation_id: ClientMutationId,
    ) -> Result<Task, ApiError>;

    async fn create_task(
        &self,
        project_id: &ProjectId,
        task: &Task,
        client_mutation_id: ClientMutationId,
    ) -> Result<Task, ApiError>;

    async fn update_task(
        &self,
        project_id: &ProjectId,
        task: &Task,
        client_mutation_id: ClientMutationId,
    ) -> Result<Task, ApiError>;

    async fn delete_task(
        &self,
        project_id: &ProjectId,
        task_id: &TaskId,
        client_mutation_id: ClientMutationId,
    ) -> Result<(), ApiError>;

    async fn create_column(
        &self,
        project_id: &ProjectId,
        column: &Column,
        client_mutation_id: ClientMutationId,
    ) -> Result<Column, ApiError>;

    async fn update_column(
        &self,
        project_id: &ProjectId,
        column: &Column,
        client_mutation_id: ClientMutationId,
    ) -> Result<Column, ApiError>;

    /// Delete a column and every task in it
    async fn delete_column(
        &self,
        project_id: &ProjectId,
        column_id: &ColumnId,
        client_mutation_id: ClientMutationId,
    ) -> Result<(), ApiError>;
}

/// Send a pending mutation to the matching endpoint
pub(crate) async fn submit<A>(
    api: &A,
    project_id: &ProjectId,
    pending: &PendingMutation,
) -> Result<ServerState, ApiError>
where
    A: BoardApi + ?Sized,
{
    let id = pending.client_mutation_id;
    match &pending.mutation {
        Mutation::MoveTask {
            task_id,
            column_id,
            index,
        } => api
            .move_task(project_id, task_id, column_id, *index, id)
            .await
            .map(ServerState::Task),
        Mutation::CreateTask { task } => api
            .create_task(project_id, task, id)
            .await
            .map(ServerState::Task),
        Mutation::UpdateTask { task } => api
            .update_task(project_id, task, id)
            .await
            .map(ServerState::Task),
        Mutation::DeleteTask { task_id } => {
            api.delete_task(project_id, task_id, id).await?;
            Ok(ServerState::TaskDeleted(task_id.clone()))
        }
        Mutation::CreateColumn { column } => api
            .create_column(project_id, column, id)
            .await
            .map(ServerState::Column),
        Mutation::UpdateColumn { column } => api
            .update_column(project_id, column, id)
            .await
            .map(ServerState::Column),
        Mutation::DeleteColumn { column_id } => {
            api.delete_column(project_id, column_id, id).await?;
            Ok(ServerState::ColumnDeleted(column_id.clone()))
        }
    }
}
