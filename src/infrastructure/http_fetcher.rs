//! HTTP implementation of the fetcher port.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::errors::LoadError;
use crate::domain::ports::{FetchHandle, FetchRequest, ImageFetcherPort};
use crate::infrastructure::SetupError;
use crate::infrastructure::config::LoaderConfig;

/// Fetches image bytes over HTTP with a bounded number of concurrent
/// downloads. Cancellation races the whole download, including the wait for
/// a download slot.
pub struct HttpFetcher {
    client: reqwest::Client,
    semaphore: Arc<Semaphore>,
}

impl HttpFetcher {
    /// Builds the fetcher from the loader configuration.
    ///
    /// # Errors
    /// Returns [`SetupError::HttpClient`] if the client cannot be built.
    pub fn new(config: &LoaderConfig) -> Result<Self, SetupError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| SetupError::HttpClient(err.to_string()))?;
        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_downloads.max(1))),
        })
    }

    #[allow(clippy::cast_possible_truncation)]
    async fn download(&self, request: &FetchRequest) -> Result<Bytes, LoadError> {
        let mut builder = self.client.get(&request.url);
        if !request.options.use_protocol_cache_policy {
            builder = builder
                .header(reqwest::header::CACHE_CONTROL, "no-cache")
                .header(reqwest::header::PRAGMA, "no-cache");
        }
        if request.options.handle_cookies {
            // The client's cookie store is process-wide; the flag cannot be
            // honored per request here.
            debug!(url = %request.url, "handle_cookies requested");
        }

        let response = builder
            .send()
            .await
            .map_err(|err| LoadError::fetch_failed(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::fetch_failed(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("unknown")
            )));
        }

        if request.options.progressive_download
            && let Some(progress) = &request.progress
        {
            let expected = response.content_length();
            let mut stream = response.bytes_stream();
            let mut received = Vec::new();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk
                    .map_err(|err| LoadError::fetch_failed(format!("body read failed: {err}")))?;
                received.extend_from_slice(&chunk);
                progress(received.len() as u64, expected);
            }
            Ok(Bytes::from(received))
        } else {
            response
                .bytes()
                .await
                .map_err(|err| LoadError::fetch_failed(format!("body read failed: {err}")))
        }
    }
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ImageFetcherPort for HttpFetcher {
    async fn fetch(&self, request: FetchRequest, handle: FetchHandle) -> Result<Bytes, LoadError> {
        let work = async {
            let _permit = self
                .semaphore
                .acquire()
                .await
                .map_err(|_| LoadError::fetch_failed("download pool closed"))?;
            self.download(&request).await
        };

        tokio::select! {
            biased;
            () = handle.cancelled() => Err(LoadError::fetch_failed("cancelled")),
            result = work => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::LoadOptions;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&LoaderConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn cancelled_handle_resolves_without_a_request() {
        let handle = FetchHandle::new();
        handle.cancel();

        let request = FetchRequest {
            url: "https://example.invalid/pic.png".into(),
            options: LoadOptions::default(),
            progress: None,
        };
        let err = fetcher().fetch(request, handle).await.unwrap_err();
        assert!(matches!(err, LoadError::FetchFailed { message } if message == "cancelled"));
    }

    #[tokio::test]
    async fn cancellation_wins_while_waiting_for_a_slot() {
        let config = LoaderConfig {
            max_concurrent_downloads: 1,
            ..LoaderConfig::default()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();

        // Occupy the only slot so the fetch blocks on the semaphore.
        let _permit = fetcher.semaphore.clone().acquire_owned().await.unwrap();

        let handle = FetchHandle::new();
        let request = FetchRequest {
            url: "https://example.invalid/pic.png".into(),
            options: LoadOptions::default(),
            progress: None,
        };

        let pending = fetcher.fetch(request, handle.clone());
        tokio::pin!(pending);

        tokio::select! {
            _ = &mut pending => panic!("fetch must not resolve while the slot is held"),
            () = tokio::time::sleep(Duration::from_millis(10)) => {}
        }

        handle.cancel();
        let err = pending.await.unwrap_err();
        assert!(matches!(err, LoadError::FetchFailed { message } if message == "cancelled"));
    }
}
