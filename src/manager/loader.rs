//! The load manager: sequences cache lookup, tier fallback, network fetch,
//! decode/edit, cache population, and completion dispatch.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::oneshot;
use tracing::{debug, error, trace};

use crate::domain::entities::{
    CacheTier, CachedImage, ImageResource, LoadOptions, LoadOutput, LoadResult,
};
use crate::domain::errors::LoadError;
use crate::domain::ports::{
    CacheQueryResult, FetchHandle, FetchRequest, ImageCachePort, ImageDecoderPort, ImageEditor,
    ImageFetcherPort, ProgressFn,
};
use crate::infrastructure::{
    DiskByteCache, HttpFetcher, LoaderConfig, MemoryImageCache, SetupError, StandardDecoder,
    TieredImageCache,
};
use crate::manager::registry::TaskRegistry;
use crate::manager::task::{LoadTask, TaskInner};

/// Orchestrates image loads over the cache, fetcher, and decoder ports.
///
/// Each [`load`](Self::load) returns a cancellable [`LoadTask`] synchronously
/// and runs the pipeline on the Tokio runtime; exactly one terminal result is
/// delivered per task unless it is cancelled first, in which case none is.
pub struct LoadManager {
    cache: Arc<dyn ImageCachePort>,
    fetcher: Arc<dyn ImageFetcherPort>,
    decoder: Arc<dyn ImageDecoderPort>,
    registry: Arc<TaskRegistry>,
}

impl std::fmt::Debug for LoadManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadManager")
            .field("in_flight", &self.registry.count())
            .finish_non_exhaustive()
    }
}

impl LoadManager {
    /// Creates a manager over explicit collaborator implementations.
    #[must_use]
    pub fn new(
        cache: Arc<dyn ImageCachePort>,
        fetcher: Arc<dyn ImageFetcherPort>,
        decoder: Arc<dyn ImageDecoderPort>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            decoder,
            registry: Arc::new(TaskRegistry::new()),
        }
    }

    /// Creates a manager with the default infrastructure stack: tiered
    /// memory/disk cache, HTTP fetcher, and standard decoder.
    ///
    /// # Errors
    /// Returns an error if the disk cache directory or the HTTP client cannot
    /// be created.
    pub async fn with_defaults(config: LoaderConfig) -> Result<Self, SetupError> {
        let memory = Arc::new(MemoryImageCache::new(config.memory_capacity));
        let disk = Arc::new(DiskByteCache::new(config.disk_path(), config.disk_budget).await?);
        let cache = Arc::new(TieredImageCache::new(memory, disk));
        let fetcher = Arc::new(HttpFetcher::new(&config)?);
        Ok(Self::new(cache, fetcher, Arc::new(StandardDecoder::new())))
    }

    /// Starts a load and returns its task handle immediately.
    ///
    /// Must be called within a Tokio runtime. The optional `editor` is
    /// applied before completion and its key is stamped onto the produced
    /// image; the optional `progress` callback is forwarded to the fetcher.
    pub fn load(
        &self,
        resource: ImageResource,
        options: LoadOptions,
        editor: Option<Arc<dyn ImageEditor>>,
        progress: Option<ProgressFn>,
    ) -> LoadTask {
        let (tx, rx) = oneshot::channel();
        let task = Arc::new(TaskInner::new(
            self.registry.next_id(),
            Arc::downgrade(&self.registry),
            tx,
        ));
        self.registry.add(task.clone());
        trace!(task = task.id(), key = %resource.key, "load task registered");

        let job = LoadJob {
            cache: self.cache.clone(),
            fetcher: self.fetcher.clone(),
            decoder: self.decoder.clone(),
            registry: self.registry.clone(),
            task: task.clone(),
            resource,
            options,
            editor,
            progress,
        };
        tokio::spawn(job.run());

        LoadTask::new(task, rx)
    }

    /// Cancels every in-flight load.
    pub fn cancel_all(&self) {
        self.registry.cancel_all();
    }

    /// Number of in-flight load tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.registry.count()
    }
}

/// A pending write-back to the cache, applied after completion dispatch.
struct StoreOp {
    image: CachedImage,
    bytes: Option<Bytes>,
    scope: CacheTier,
}

/// One load's pipeline state, moved onto the runtime by `LoadManager::load`.
struct LoadJob {
    cache: Arc<dyn ImageCachePort>,
    fetcher: Arc<dyn ImageFetcherPort>,
    decoder: Arc<dyn ImageDecoderPort>,
    registry: Arc<TaskRegistry>,
    task: Arc<TaskInner>,
    resource: ImageResource,
    options: LoadOptions,
    editor: Option<Arc<dyn ImageEditor>>,
    progress: Option<ProgressFn>,
}

impl LoadJob {
    async fn run(self) {
        let (result, store) = self.execute().await;

        if let Some(result) = result {
            let delivered = self.task.complete(result);
            if !delivered {
                trace!(task = self.task.id(), "completion suppressed");
            }
        }

        if let Some(op) = store {
            // Cancellation may land while decode work is finishing; re-check
            // immediately before the store side effect.
            if !self.task.is_cancelled() {
                self.cache
                    .store(Some(op.image), op.bytes, &self.resource.key, op.scope)
                    .await;
            }
        }

        self.registry.remove(&self.task);
    }

    /// Runs steps 2-6 of the pipeline. A `None` result means the task was
    /// cancelled and nothing may be delivered.
    async fn execute(&self) -> (Option<LoadResult>, Option<StoreOp>) {
        let key = &self.resource.key;
        let mut memory_hit = false;

        if !self.options.refresh_cache {
            match self.cache.query(key, CacheTier::Memory).await {
                CacheQueryResult::Memory(cached) => {
                    memory_hit = true;
                    if !self.options.query_disk_when_in_memory {
                        if let Some(done) = self.memory_shortcut(cached).await {
                            return done;
                        }
                    }
                }
                CacheQueryResult::Miss => {}
                CacheQueryResult::Disk(_) => {
                    return (Some(Err(self.illegal_result(CacheTier::Memory))), None);
                }
            }
        }

        let mut from_disk = false;
        let mut tier = if memory_hit {
            CacheTier::Memory
        } else {
            CacheTier::None
        };
        let mut cached_bytes: Option<Bytes> = None;

        if !self.options.refresh_cache && !self.options.ignore_disk_cache {
            match self.cache.query(key, CacheTier::Disk).await {
                CacheQueryResult::Disk(data) => {
                    trace!(key = %key, "disk tier hit");
                    from_disk = true;
                    tier = if memory_hit {
                        CacheTier::Both
                    } else {
                        CacheTier::Disk
                    };
                    cached_bytes = Some(data);
                }
                CacheQueryResult::Miss => {}
                CacheQueryResult::Memory(_) => {
                    return (Some(Err(self.illegal_result(CacheTier::Disk))), None);
                }
            }
        }

        if self.task.is_cancelled() {
            return (None, None);
        }

        let bytes = if let Some(bytes) = cached_bytes {
            bytes
        } else {
            let handle = FetchHandle::new();
            self.task.attach_fetch_handle(handle.clone());
            if handle.is_cancelled() {
                return (None, None);
            }
            debug!(key = %key, url = %self.resource.url, "fetching from network");
            let request = FetchRequest {
                url: self.resource.url.clone(),
                options: self.options,
                progress: self.progress.clone(),
            };
            match self.fetcher.fetch(request, handle).await {
                Ok(data) => data,
                Err(err) => {
                    if self.task.is_cancelled() {
                        return (None, None);
                    }
                    debug!(key = %key, error = %err, "network fetch failed");
                    return (Some(Err(err)), None);
                }
            }
        };

        if self.task.is_cancelled() {
            return (None, None);
        }

        // Bytes already durable on disk, or the caller opted out of
        // persistence: write back to memory only. Fresh fetches go to both.
        let scope = if from_disk || self.options.ignore_disk_cache {
            CacheTier::Memory
        } else {
            CacheTier::Both
        };

        self.byte_pipeline(bytes, tier, scope).await
    }

    /// Resolves a memory hit without touching the byte path, when possible.
    /// Returns `None` when the hit is not shortcut-able: a mismatched edit
    /// stamp, a stamped image with no editor requested, or an editor that
    /// needs the raw bytes. Edited pixels are never re-edited.
    async fn memory_shortcut(
        &self,
        cached: CachedImage,
    ) -> Option<(Option<LoadResult>, Option<StoreOp>)> {
        let hit = |image: CachedImage| {
            Some((
                Some(Ok(LoadOutput {
                    image,
                    bytes: None,
                    tier: CacheTier::Memory,
                })),
                None,
            ))
        };

        match &self.editor {
            None if cached.edit_key.is_none() => {
                trace!(key = %self.resource.key, "memory tier hit");
                hit(cached)
            }
            Some(editor) if cached.stamped_with(editor.key()) => {
                trace!(key = %self.resource.key, editor = editor.key(), "memory tier hit, edit stamp matches");
                hit(cached)
            }
            Some(editor) if cached.edit_key.is_none() && !editor.needs_raw_bytes() => {
                let applier = editor.clone();
                let source = cached.image.clone();
                let applied =
                    tokio::task::spawn_blocking(move || applier.apply(Some(&source), None)).await;

                let result = match applied {
                    Ok(Ok(img)) => Ok(CachedImage::edited(
                        Arc::new(img),
                        editor.key(),
                        cached.source_format,
                    )),
                    Ok(Err(reason)) => Err(LoadError::edit_failed(editor.key(), reason)),
                    Err(join) => Err(LoadError::edit_failed(
                        editor.key(),
                        format!("edit task panicked: {join}"),
                    )),
                };

                if self.task.is_cancelled() {
                    return Some((None, None));
                }
                match result {
                    Ok(image) => Some((
                        Some(Ok(LoadOutput {
                            image: image.clone(),
                            bytes: None,
                            tier: CacheTier::Memory,
                        })),
                        // No raw bytes available to persist.
                        Some(StoreOp {
                            image,
                            bytes: None,
                            scope: CacheTier::Memory,
                        }),
                    )),
                    Err(err) => Some((Some(Err(err)), None)),
                }
            }
            _ => None,
        }
    }

    /// Step 6: decode and/or edit on the blocking pool, then hand the result
    /// and its write-back up to `run`.
    async fn byte_pipeline(
        &self,
        bytes: Bytes,
        tier: CacheTier,
        scope: CacheTier,
    ) -> (Option<LoadResult>, Option<StoreOp>) {
        let decoder = self.decoder.clone();
        let editor = self.editor.clone();
        let skip_post_decode = self.options.skip_post_decode;
        let raw = bytes.clone();

        let produced = tokio::task::spawn_blocking(move || -> Result<CachedImage, LoadError> {
            match editor {
                Some(editor) if editor.needs_raw_bytes() => {
                    let format = decoder.sniff_format(&raw);
                    let img = editor
                        .apply(None, Some(&raw))
                        .map_err(|reason| LoadError::edit_failed(editor.key(), reason))?;
                    Ok(CachedImage::edited(Arc::new(img), editor.key(), format))
                }
                Some(editor) => {
                    let decoded = decoder.decode(&raw)?;
                    let img = editor
                        .apply(Some(&decoded.image), None)
                        .map_err(|reason| LoadError::edit_failed(editor.key(), reason))?;
                    Ok(CachedImage::edited(
                        Arc::new(img),
                        editor.key(),
                        decoded.format,
                    ))
                }
                None => {
                    let decoded = decoder.decode(&raw)?;
                    let img = if skip_post_decode {
                        decoded.image
                    } else {
                        decoder.post_decode(decoded.image, &raw)?
                    };
                    Ok(CachedImage::plain(Arc::new(img), decoded.format))
                }
            }
        })
        .await;

        let produced = produced.unwrap_or_else(|join| {
            Err(LoadError::invalid_data(format!(
                "decode task panicked: {join}"
            )))
        });

        if self.task.is_cancelled() {
            return (None, None);
        }

        match produced {
            Ok(image) => (
                Some(Ok(LoadOutput {
                    image: image.clone(),
                    bytes: Some(bytes.clone()),
                    tier,
                })),
                Some(StoreOp {
                    image,
                    bytes: scope.includes_disk().then_some(bytes),
                    scope,
                }),
            ),
            Err(err) => {
                debug!(key = %self.resource.key, error = %err, "byte pipeline failed");
                (Some(Err(err)), None)
            }
        }
    }

    fn illegal_result(&self, queried: CacheTier) -> LoadError {
        error!(
            key = %self.resource.key,
            queried = %queried,
            "cache answered with a result shape inconsistent with the queried tier"
        );
        LoadError::IllegalCacheResult { queried }
    }
}
