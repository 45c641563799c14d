use super::{TaskStore, UndoAction, UndoLedger};
use crate::domain::{
    normalize_tags, InvalidTask, Session, Task, TaskDraft, TaskId, TaskPatch, TaskQuery,
};
use crate::ports::TaskRepository;
use chrono::Utc;
use std::sync::Arc;

/// Terminal state of one optimistic mutation. The intermediate
/// "optimistic-applied" state exists only between the local apply and the
/// remote response, inside a single coordinator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Confirmed,
    RolledBack,
}

/// Applies optimistic local mutations, issues the corresponding remote
/// calls, and reconciles success/failure. Sole writer of the task store.
///
/// Mutations are serialized by construction: every operation takes
/// `&mut self` and awaits its remote call to completion, so two mutations on
/// the same task can never have their confirmations race each other.
/// Remote failures never escape this boundary; they roll the store back to
/// the exact pre-mutation snapshot and set the session error message.
pub struct MutationCoordinator {
    repository: Arc<dyn TaskRepository>,
    store: TaskStore,
    ledger: UndoLedger,
    local_seq: i64,
    error: Option<String>,
}

impl MutationCoordinator {
    pub fn new(repository: Arc<dyn TaskRepository>) -> Self {
        Self {
            repository,
            store: TaskStore::new(),
            ledger: UndoLedger::new(),
            local_seq: 0,
            error: None,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Session-level error message from the most recent failed operation.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Dismiss and return the current error banner.
    pub fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }

    pub fn can_undo(&self) -> bool {
        self.ledger.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.ledger.can_redo()
    }

    /// Bulk load from the remote API. On failure the store keeps its
    /// last-known contents, never a partial population.
    pub async fn refresh(&mut self, session: &Session, query: &TaskQuery) -> bool {
        match self.repository.list_tasks(session, query).await {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "loaded task list");
                self.store.replace_all(tasks);
                // A bulk load supersedes whatever the delete history refers to.
                self.ledger.clear();
                true
            }
            Err(e) => {
                self.set_error(format!("Failed to load tasks: {e}"));
                false
            }
        }
    }

    /// Optimistic create: a provisional record with a client-temporary id
    /// goes to the front of the store before the remote call is issued. On
    /// success the temporary record is swapped for the server record in the
    /// same position; on failure it is removed.
    pub async fn create(
        &mut self,
        session: &Session,
        draft: TaskDraft,
    ) -> Result<MutationOutcome, InvalidTask> {
        let mut draft = draft;
        draft.title = draft.validated_title()?;
        draft.tags = draft.tags.as_deref().and_then(normalize_tags);

        let temp_id = self.next_local_id();
        let now = Utc::now();
        let provisional = Task {
            id: temp_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            completed: false,
            priority: draft.priority.unwrap_or_default(),
            due_date: draft.due_date,
            tags: draft.tags.clone(),
            user_id: session.user_id,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        self.store.insert_front(provisional);

        match self.repository.create_task(session, &draft).await {
            Ok(created) => {
                tracing::debug!(%temp_id, id = %created.id, "create confirmed");
                self.store.replace(&temp_id, created);
                Ok(MutationOutcome::Confirmed)
            }
            Err(e) => {
                self.store.remove(&temp_id);
                self.set_error(format!("Failed to add task: {e}"));
                Ok(MutationOutcome::RolledBack)
            }
        }
    }

    /// Optimistic delete. The removed record and its position are captured
    /// in the undo ledger before the remote call goes out, so the undo
    /// affordance is available while the request is outstanding.
    pub async fn delete(&mut self, session: &Session, id: &TaskId) -> MutationOutcome {
        let Some((index, task)) = self.store.remove(id) else {
            return MutationOutcome::Confirmed;
        };
        self.ledger.add_action(UndoAction::Delete {
            index,
            task: task.clone(),
        });

        match self.repository.delete_task(session, id).await {
            Ok(()) => MutationOutcome::Confirmed,
            Err(e) => {
                // The rollback restores the task itself, so the recorded
                // undo action must not survive to restore it a second time.
                self.ledger.retract_last();
                self.store.insert_at(index, task);
                self.set_error(format!("Failed to delete task: {e}"));
                MutationOutcome::RolledBack
            }
        }
    }

    /// Optimistic partial edit. On success the merged record stays
    /// authoritative except for the server's timestamps; no refetch. On
    /// failure the exact pre-mutation snapshot is restored.
    pub async fn update(
        &mut self,
        session: &Session,
        id: &TaskId,
        patch: TaskPatch,
    ) -> Result<MutationOutcome, InvalidTask> {
        let mut patch = patch;
        if let Some(title) = patch.title.take() {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(InvalidTask::EmptyTitle);
            }
            patch.title = Some(title);
        }

        let Some(prior) = self.store.update(id, &patch) else {
            return Ok(MutationOutcome::Confirmed);
        };

        match self.repository.update_task(session, id, &patch).await {
            Ok(confirmed) => {
                self.adopt_server_stamps(id, &confirmed);
                Ok(MutationOutcome::Confirmed)
            }
            Err(e) => {
                self.store.replace(id, prior);
                self.set_error(format!("Failed to update task: {e}"));
                Ok(MutationOutcome::RolledBack)
            }
        }
    }

    /// The update pattern restricted to the completion flag, via the
    /// dedicated toggle endpoint.
    pub async fn toggle_complete(&mut self, session: &Session, id: &TaskId) -> MutationOutcome {
        let Some(current) = self.store.get(id) else {
            return MutationOutcome::Confirmed;
        };
        let completed = !current.completed;

        let patch = TaskPatch {
            completed: Some(completed),
            ..Default::default()
        };
        let Some(prior) = self.store.update(id, &patch) else {
            return MutationOutcome::Confirmed;
        };

        match self.repository.toggle_complete(session, id, completed).await {
            Ok(confirmed) => {
                self.adopt_server_stamps(id, &confirmed);
                MutationOutcome::Confirmed
            }
            Err(e) => {
                self.store.replace(id, prior);
                self.set_error(format!("Failed to update task status: {e}"));
                MutationOutcome::RolledBack
            }
        }
    }

    /// Replay the most recent reversible action in reverse: a deleted task
    /// reappears at its prior position. Local replay only; a remote delete
    /// that already settled is not compensated (see DESIGN.md).
    pub fn undo(&mut self) -> Option<TaskId> {
        let UndoAction::Delete { index, task } = self.ledger.undo()?;
        let id = task.id;
        self.store.insert_at(index, task);
        Some(id)
    }

    /// Re-apply the most recently undone action: the restored task is
    /// removed again.
    pub fn redo(&mut self) -> Option<TaskId> {
        let UndoAction::Delete { task, .. } = self.ledger.redo()?;
        self.store.remove(&task.id);
        Some(task.id)
    }

    /// Drop all session state (sign-out).
    #[allow(dead_code)] // Wired up once the console grows a sign-out command
    pub fn clear_session(&mut self) {
        self.store.clear();
        self.ledger.clear();
        self.error = None;
    }

    /// Confirmation keeps the optimistic record authoritative but adopts the
    /// server's completion state and timestamps.
    fn adopt_server_stamps(&mut self, id: &TaskId, confirmed: &Task) {
        if let Some(current) = self.store.get(id) {
            let mut merged = current.clone();
            merged.completed = confirmed.completed;
            merged.completed_at = confirmed.completed_at;
            merged.updated_at = confirmed.updated_at;
            self.store.replace(id, merged);
        }
    }

    /// Allocate a client-temporary id: negative, time-derived, and strictly
    /// decreasing so rapid creates in the same millisecond never collide.
    fn next_local_id(&mut self) -> TaskId {
        let now = -Utc::now().timestamp_millis();
        self.local_seq = now.min(self.local_seq - 1);
        TaskId(self.local_seq)
    }

    fn set_error(&mut self, message: String) {
        tracing::warn!("{message}");
        self.error = Some(message);
    }
}
