use crate::domain::{Session, Task, TaskDraft, TaskId, TaskPatch, TaskQuery};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not authorized: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited: retry after {0} seconds")]
    RateLimit(u64),

    #[error("API error: {0}")]
    Api(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Remote task API, keyed by user and task id. The session carries the
/// bearer credential for every call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn list_tasks(&self, session: &Session, query: &TaskQuery) -> RepositoryResult<Vec<Task>>;
    async fn create_task(&self, session: &Session, draft: &TaskDraft) -> RepositoryResult<Task>;
    async fn update_task(
        &self,
        session: &Session,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> RepositoryResult<Task>;
    async fn delete_task(&self, session: &Session, id: &TaskId) -> RepositoryResult<()>;
    async fn toggle_complete(
        &self,
        session: &Session,
        id: &TaskId,
        completed: bool,
    ) -> RepositoryResult<Task>;
}
