use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use uuid::Uuid;

use super::task::Task;
use crate::error::StoreError;

/// The authoritative task collection. Kept in insertion order; every ordered
/// view is derived from it with a stable sort, so equal-ranked tasks stay in
/// the order they were added.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut store = Self::new();
        store.replace_all(tasks);
        store
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    fn position(&self, id: Uuid) -> Option<usize> {
        self.tasks.iter().position(|t| t.id() == id)
    }

    /// Append a task and return its id. A task whose id is already present
    /// is given a fresh one.
    pub fn add(&mut self, task: Task) -> Uuid {
        let task = if self.position(task.id()).is_some() {
            log::debug!("Duplicate task id {} on add, assigning a new one", task.id());
            task.with_id(Uuid::new_v4())
        } else {
            task
        };
        let id = task.id();
        self.tasks.push(task);
        id
    }

    /// Substitute the task stored under `id`. The replacement takes over the
    /// old id and the old slot in insertion order.
    pub fn replace(&mut self, id: Uuid, task: Task) -> Result<(), StoreError> {
        let index = self.position(id).ok_or(StoreError::NotFound(id))?;
        self.tasks[index] = task.with_id(id);
        Ok(())
    }

    pub fn remove(&mut self, id: Uuid) -> Result<Task, StoreError> {
        let index = self.position(id).ok_or(StoreError::NotFound(id))?;
        Ok(self.tasks.remove(index))
    }

    /// Id of the first task equal by value to `task`.
    pub fn find_by_value(&self, task: &Task) -> Option<Uuid> {
        self.tasks
            .iter()
            .find(|t| t.same_value(task))
            .map(Task::id)
    }

    /// A freshly sorted copy in canonical order.
    pub fn snapshot_sorted(&self) -> Vec<Task> {
        let mut sorted = self.tasks.clone();
        sorted.sort_by(Task::canonical_cmp);
        sorted
    }

    /// Swap in a whole collection, typically after a load. Repeated ids are
    /// reassigned so lookups stay unambiguous.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        let mut seen = HashSet::with_capacity(tasks.len());
        self.tasks = tasks
            .into_iter()
            .map(|task| {
                if seen.insert(task.id()) {
                    task
                } else {
                    log::warn!("Task {:?} shares id {} with another task, reassigning", task.title(), task.id());
                    let task = task.with_id(Uuid::new_v4());
                    seen.insert(task.id());
                    task
                }
            })
            .collect();
    }
}

/// Store shared between the foreground session (sole writer) and background
/// readers. Every mutation runs entirely under the write lock, so readers never
/// observe a half-applied change.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    inner: Arc<RwLock<TaskStore>>,
}

impl SharedStore {
    pub fn new(store: TaskStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, TaskStore> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mutate<R>(&self, f: impl FnOnce(&mut TaskStore) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn snapshot_sorted(&self) -> Vec<Task> {
        self.read().snapshot_sorted()
    }

    /// A read-only handle for background activities.
    pub fn reader(&self) -> StoreReader {
        StoreReader {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Read-only view of a [`SharedStore`]. Hands out copies and never holds the
/// lock past the call.
#[derive(Debug, Clone)]
pub struct StoreReader {
    inner: Arc<RwLock<TaskStore>>,
}

impl StoreReader {
    pub fn snapshot(&self) -> Vec<Task> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .tasks()
            .to_vec()
    }
}
