//! Cancellable load task handles.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::trace;

use crate::domain::entities::LoadResult;
use crate::domain::ports::FetchHandle;
use crate::manager::registry::TaskRegistry;

/// Shared state of one in-flight load, owned by the registry and referenced
/// by the caller's [`LoadTask`] handle.
pub(crate) struct TaskInner {
    id: u64,
    cancelled: Mutex<bool>,
    fetch_handle: Mutex<Option<FetchHandle>>,
    completion: Mutex<Option<oneshot::Sender<LoadResult>>>,
    registry: Weak<TaskRegistry>,
}

impl TaskInner {
    pub(crate) fn new(
        id: u64,
        registry: Weak<TaskRegistry>,
        completion: oneshot::Sender<LoadResult>,
    ) -> Self {
        Self {
            id,
            cancelled: Mutex::new(false),
            fetch_handle: Mutex::new(None),
            completion: Mutex::new(Some(completion)),
            registry,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        *self.cancelled.lock()
    }

    /// Cancels the task. Idempotent: the flag is checked and set under its
    /// lock, and only the first caller performs the teardown. The fetch
    /// handle and registry are touched outside the lock, since both can call
    /// back into task state.
    pub(crate) fn cancel(self: &Arc<Self>) {
        {
            let mut cancelled = self.cancelled.lock();
            if *cancelled {
                return;
            }
            *cancelled = true;
        }

        if let Some(handle) = self.fetch_handle.lock().take() {
            handle.cancel();
        }
        // Drop the sender: the caller's awaited outcome resolves to None and
        // no completion can fire later.
        drop(self.completion.lock().take());

        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self);
        }
        trace!(task = self.id, "load task cancelled");
    }

    /// Attaches the in-flight fetch handle so `cancel` can reach it. Holding
    /// the cancelled lock while attaching closes the race with a concurrent
    /// cancel: either the flag is already set and the handle is cancelled
    /// here, or cancel observes the attached handle afterwards.
    pub(crate) fn attach_fetch_handle(&self, handle: FetchHandle) {
        let cancelled = self.cancelled.lock();
        if *cancelled {
            drop(cancelled);
            handle.cancel();
            return;
        }
        *self.fetch_handle.lock() = Some(handle);
    }

    /// Delivers the terminal result, unless the task was cancelled first or a
    /// result was already delivered. Returns true when the result was sent.
    pub(crate) fn complete(&self, result: LoadResult) -> bool {
        let sender = {
            let cancelled = self.cancelled.lock();
            if *cancelled {
                None
            } else {
                self.completion.lock().take()
            }
        };
        match sender {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }
}

impl std::fmt::Debug for TaskInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskInner")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Caller-side handle to one load request.
///
/// Returned synchronously by [`LoadManager::load`](crate::manager::LoadManager::load).
/// Identity, equality and hashing are keyed on the task's sentinel id, not on
/// object identity. Cancelling is idempotent; a cancelled task never resolves
/// its outcome.
#[derive(Debug)]
pub struct LoadTask {
    inner: Arc<TaskInner>,
    outcome: oneshot::Receiver<LoadResult>,
}

impl LoadTask {
    pub(crate) fn new(inner: Arc<TaskInner>, outcome: oneshot::Receiver<LoadResult>) -> Self {
        Self { inner, outcome }
    }

    /// The task's sentinel id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id()
    }

    /// Thread-safe snapshot of the cancellation flag.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Cancels the load: no completion will be delivered, the in-flight fetch
    /// (if any) is aborted best-effort, and the task leaves the registry.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Awaits the terminal result. Resolves to `None` when the task was
    /// cancelled (or the result was already taken); otherwise yields the one
    /// terminal result exactly once.
    pub async fn outcome(&mut self) -> Option<LoadResult> {
        (&mut self.outcome).await.ok()
    }
}

impl PartialEq for LoadTask {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for LoadTask {}

impl std::hash::Hash for LoadTask {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{CacheTier, CachedImage, LoadOutput};

    fn bare_task(id: u64) -> (Arc<TaskInner>, oneshot::Receiver<LoadResult>) {
        let (tx, rx) = oneshot::channel();
        (Arc::new(TaskInner::new(id, Weak::new(), tx)), rx)
    }

    fn dummy_output() -> LoadOutput {
        LoadOutput {
            image: CachedImage::plain(Arc::new(image::DynamicImage::new_rgb8(1, 1)), None),
            bytes: None,
            tier: CacheTier::None,
        }
    }

    #[tokio::test]
    async fn cancel_is_idempotent_and_suppresses_completion() {
        let (inner, rx) = bare_task(1);

        inner.cancel();
        inner.cancel();
        assert!(inner.is_cancelled());

        assert!(!inner.complete(Ok(dummy_output())));
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn complete_delivers_exactly_once() {
        let (inner, rx) = bare_task(2);

        assert!(inner.complete(Ok(dummy_output())));
        assert!(!inner.complete(Ok(dummy_output())));

        let result = rx.await.expect("first completion must arrive");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn handle_attached_after_cancel_is_cancelled_immediately() {
        let (inner, _rx) = bare_task(3);
        inner.cancel();

        let handle = FetchHandle::new();
        inner.attach_fetch_handle(handle.clone());
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_propagates_into_attached_handle() {
        let (inner, _rx) = bare_task(4);

        let handle = FetchHandle::new();
        inner.attach_fetch_handle(handle.clone());
        assert!(!handle.is_cancelled());

        inner.cancel();
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn task_identity_is_keyed_on_sentinel() {
        use std::collections::HashSet;

        let (a_inner, a_rx) = bare_task(7);
        let (b_inner, b_rx) = bare_task(7);
        let (c_inner, c_rx) = bare_task(8);

        let a = LoadTask::new(a_inner, a_rx);
        let b = LoadTask::new(b_inner, b_rx);
        let c = LoadTask::new(c_inner, c_rx);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        set.insert(c);
        assert_eq!(set.len(), 2);
    }
}
