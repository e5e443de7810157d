//! Thread-safe set of in-flight load tasks.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::manager::task::TaskInner;

/// Registry of in-flight tasks, owned by the manager.
///
/// Also allocates the monotonically increasing sentinel ids; there is no
/// ambient global counter.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<u64, Arc<TaskInner>>>,
    next_id: AtomicU64,
}

impl TaskRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next sentinel id.
    pub(crate) fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn add(&self, task: Arc<TaskInner>) {
        self.tasks.lock().insert(task.id(), task);
    }

    /// Removes a task. Harmless when the task already left (removal happens
    /// on both the cancel path and the completion path).
    pub(crate) fn remove(&self, task: &TaskInner) {
        self.tasks.lock().remove(&task.id());
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<TaskInner>> {
        self.tasks.lock().values().cloned().collect()
    }

    /// Number of in-flight tasks.
    #[must_use]
    pub fn count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Cancels every in-flight task. The snapshot is taken under the lock,
    /// but each cancel runs outside it: cancel re-enters `remove`.
    pub fn cancel_all(&self) {
        let tasks = self.snapshot();
        if tasks.is_empty() {
            return;
        }
        debug!(count = tasks.len(), "cancelling all in-flight loads");
        for task in tasks {
            task.cancel();
        }
    }
}
