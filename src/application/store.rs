use crate::domain::{Task, TaskId, TaskPatch};

/// Ordered in-memory collection of the signed-in user's tasks; the single
/// source of truth for the view. Every operation is synchronous and total:
/// an absent id is a no-op, never an error. The mutation coordinator is the
/// only writer.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk load from a fetch, discarding whatever was held before.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    /// Newly created tasks go to the front, matching the newest-first view.
    pub fn insert_front(&mut self, task: Task) {
        self.tasks.insert(0, task);
    }

    /// Reinsert at a prior position. The index is clamped so a restore stays
    /// valid even if the collection shrank in the meantime.
    pub fn insert_at(&mut self, index: usize, task: Task) {
        let index = index.min(self.tasks.len());
        self.tasks.insert(index, task);
    }

    /// Remove by id, returning the prior position and the full record so the
    /// caller can roll back or offer undo.
    pub fn remove(&mut self, id: &TaskId) -> Option<(usize, Task)> {
        let index = self.tasks.iter().position(|t| t.id == *id)?;
        Some((index, self.tasks.remove(index)))
    }

    /// Partial merge by id, returning the exact pre-merge record.
    pub fn update(&mut self, id: &TaskId, patch: &TaskPatch) -> Option<Task> {
        let task = self.tasks.iter_mut().find(|t| t.id == *id)?;
        let prior = task.clone();
        task.apply_patch(patch);
        Some(prior)
    }

    /// Swap the record carrying `id` for `task`, keeping its position. Used
    /// to promote a temporary create to the server record and to restore a
    /// rollback snapshot.
    pub fn replace(&mut self, id: &TaskId, task: Task) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == *id) {
            Some(slot) => {
                *slot = task;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == *id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, UserId};
    use chrono::Utc;
    use uuid::Uuid;

    fn task(id: i64, title: &str) -> Task {
        let now = Utc::now();
        Task {
            id: TaskId(id),
            title: title.to_string(),
            description: None,
            completed: false,
            priority: Priority::Medium,
            due_date: None,
            tags: None,
            user_id: UserId(Uuid::nil()),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    #[test]
    fn remove_reports_prior_position() {
        let mut store = TaskStore::new();
        store.replace_all(vec![task(1, "a"), task(2, "b"), task(3, "c")]);

        let (index, removed) = store.remove(&TaskId(2)).unwrap();
        assert_eq!(index, 1);
        assert_eq!(removed.title, "b");
        assert_eq!(store.len(), 2);

        assert!(store.remove(&TaskId(99)).is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn insert_at_clamps_to_length() {
        let mut store = TaskStore::new();
        store.replace_all(vec![task(1, "a")]);

        store.insert_at(10, task(2, "b"));
        assert_eq!(store.tasks()[1].id, TaskId(2));
    }

    #[test]
    fn replace_preserves_position() {
        let mut store = TaskStore::new();
        store.replace_all(vec![task(1, "a"), task(-5, "pending"), task(3, "c")]);

        assert!(store.replace(&TaskId(-5), task(42, "confirmed")));
        assert_eq!(store.tasks()[1].id, TaskId(42));
        assert_eq!(store.tasks()[1].title, "confirmed");

        assert!(!store.replace(&TaskId(-5), task(43, "gone")));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn update_returns_pre_merge_snapshot() {
        let mut store = TaskStore::new();
        store.replace_all(vec![task(1, "before")]);

        let patch = TaskPatch {
            title: Some("after".to_string()),
            ..Default::default()
        };
        let prior = store.update(&TaskId(1), &patch).unwrap();

        assert_eq!(prior.title, "before");
        assert_eq!(store.get(&TaskId(1)).unwrap().title, "after");
        assert!(store.update(&TaskId(99), &patch).is_none());
    }

    #[test]
    fn insert_front_places_newest_first() {
        let mut store = TaskStore::new();
        store.replace_all(vec![task(1, "a")]);
        store.insert_front(task(-2, "new"));
        assert_eq!(store.tasks()[0].id, TaskId(-2));
    }
}
