//! Normalized task records keyed by id, independent of column membership

use crate::types::{ColumnId, Task, TaskId};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: HashMap<TaskId, Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    /// Column the task currently belongs to
    pub fn column_of(&self, id: &TaskId) -> Option<&ColumnId> {
        self.tasks.get(id).map(|t| &t.column_id)
    }

    pub(crate) fn insert(&mut self, task: Task) -> Option<Task> {
        self.tasks.insert(task.id.clone(), task)
    }

    pub(crate) fn remove(&mut self, id: &TaskId) -> Option<Task> {
        self.tasks.remove(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// All tasks, unordered
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let mut store = TaskStore::new();
        assert!(store.insert(Task::new("t1", "p1", "a", 0, "One")).is_none());
        assert_eq!(store.column_of(&"t1".into()), Some(&ColumnId::from("a")));
        assert_eq!(store.len(), 1);
        assert!(store.remove(&"t1".into()).is_some());
        assert!(store.remove(&"t1".into()).is_none());
        assert!(store.is_empty());
    }
}
