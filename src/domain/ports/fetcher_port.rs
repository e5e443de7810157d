//! Port definition for the network fetcher.

use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::domain::entities::LoadOptions;
use crate::domain::errors::LoadError;

/// Progress callback: `(bytes_received, bytes_expected)`.
pub type ProgressFn = Arc<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// Cancellation handle for one in-flight fetch.
///
/// The orchestrator creates one per network attempt, stores it on the owning
/// task, and cancels it when the task is cancelled. A fetcher must stop
/// delivering bytes once the handle fires.
#[derive(Debug, Clone, Default)]
pub struct FetchHandle {
    token: CancellationToken,
}

impl FetchHandle {
    /// Creates a fresh, uncancelled handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of the associated fetch. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when cancellation is requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

/// One network fetch request.
#[derive(Clone)]
pub struct FetchRequest {
    /// Network locator.
    pub url: String,
    /// Advisory options forwarded from the load request.
    pub options: LoadOptions,
    /// Optional progress callback, honored when
    /// `options.progressive_download` is set.
    pub progress: Option<ProgressFn>,
}

impl std::fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchRequest")
            .field("url", &self.url)
            .field("options", &self.options)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Port for network retrieval of raw image bytes.
///
/// De-duplication or merging of identical concurrent requests is the
/// fetcher's concern; the orchestrator issues one fetch per task.
#[async_trait::async_trait]
pub trait ImageFetcherPort: Send + Sync {
    /// Fetches the resource's bytes. Must resolve promptly with an error once
    /// `handle` is cancelled, and must not deliver bytes afterwards.
    async fn fetch(&self, request: FetchRequest, handle: FetchHandle) -> Result<Bytes, LoadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handle_cancel_is_idempotent_and_observable() {
        let handle = FetchHandle::new();
        assert!(!handle.is_cancelled());

        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());

        // Must already be resolved.
        handle.cancelled().await;
    }

    #[tokio::test]
    async fn clones_share_cancellation_state() {
        let handle = FetchHandle::new();
        let observer = handle.clone();

        handle.cancel();
        assert!(observer.is_cancelled());
    }
}
