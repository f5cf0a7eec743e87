//! Live tasks keyed by id

use std::sync::Arc;

use dashmap::DashMap;

use media_cache_core::{CacheError, PrefetchReport, Result};

use super::task::TaskCell;

/// Tasks that have not reached a terminal status
///
/// Created empty and handed to the manager; clones share the same map.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<DashMap<String, Arc<TaskCell>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task; ids must be unique among live tasks
    pub fn insert(&self, cell: Arc<TaskCell>) -> Result<()> {
        match self.tasks.entry(cell.task_id().to_string()) {
            dashmap::mapref::entry::Entry::Occupied(o) => {
                Err(CacheError::DuplicateTask(o.key().clone()))
            }
            dashmap::mapref::entry::Entry::Vacant(v) => {
                v.insert(cell);
                Ok(())
            }
        }
    }

    pub fn get(&self, task_id: &str) -> Option<Arc<TaskCell>> {
        self.tasks.get(task_id).map(|c| c.value().clone())
    }

    pub fn remove(&self, task_id: &str) -> Option<Arc<TaskCell>> {
        self.tasks.remove(task_id).map(|(_, cell)| cell)
    }

    /// Remove `cell` only if it is still the task registered under its id
    pub fn remove_cell(&self, cell: &Arc<TaskCell>) -> bool {
        self.tasks
            .remove_if(cell.task_id(), |_, current| Arc::ptr_eq(current, cell))
            .is_some()
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.tasks.contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task_ids(&self) -> Vec<String> {
        self.tasks.iter().map(|c| c.key().clone()).collect()
    }

    /// Current report of every live task
    pub fn snapshots(&self) -> Vec<PrefetchReport> {
        self.tasks.iter().map(|c| c.value().snapshot()).collect()
    }

    /// Request cancellation of every live task
    pub fn cancel_all(&self) {
        for cell in self.tasks.iter() {
            cell.value().token().cancel();
        }
    }
}
