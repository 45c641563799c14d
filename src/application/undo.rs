use crate::domain::Task;

/// A reversible destructive action. The action carries everything needed to
/// replay its inverse; applying it is the caller's job.
#[derive(Debug, Clone)]
pub enum UndoAction {
    Delete { index: usize, task: Task },
}

/// Two-stack history (past / future) of reversible actions, currently scoped
/// to deletions. Pure bookkeeping: the ledger never touches the task store,
/// it only hands actions back for the caller to replay.
#[derive(Debug, Default)]
pub struct UndoLedger {
    past: Vec<UndoAction>,
    future: Vec<UndoAction>,
}

impl UndoLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new action. Clears the redo side: linear history, a new
    /// action invalidates anything previously undone.
    pub fn add_action(&mut self, action: UndoAction) {
        self.past.push(action);
        self.future.clear();
    }

    /// Move the most recent action to the redo side and return a copy for
    /// the caller to apply in reverse.
    pub fn undo(&mut self) -> Option<UndoAction> {
        let action = self.past.pop()?;
        self.future.push(action.clone());
        Some(action)
    }

    /// Move the most recently undone action back and return a copy for the
    /// caller to re-apply.
    pub fn redo(&mut self) -> Option<UndoAction> {
        let action = self.future.pop()?;
        self.past.push(action.clone());
        Some(action)
    }

    /// Drop the most recent recorded action without touching the redo side.
    /// Used when the action it describes was itself rolled back.
    pub fn retract_last(&mut self) -> Option<UndoAction> {
        self.past.pop()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }
}
