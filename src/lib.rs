//! Oxipix - an async tiered image loading core.
//!
//! This crate loads images identified by URL-like keys through a two-tier
//! cache (in-memory LRU, on-disk bytes) and an HTTP fetch path, with an
//! optional per-request edit step, and hands each caller a cancellable
//! [`LoadTask`](manager::LoadTask) that resolves to exactly one result.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Default adapters: memory/disk caches, HTTP fetcher, decoder, config.
pub mod infrastructure;
/// Request orchestration: load tasks, the task registry, and the manager.
pub mod manager;

pub use domain::entities::{
    CacheKey, CacheTier, CachedImage, ImageResource, LoadOptions, LoadOutput, LoadResult,
};
pub use domain::errors::LoadError;
pub use domain::ports::{
    CacheQueryResult, DecodedImage, FetchHandle, FetchRequest, ImageCachePort, ImageDecoderPort,
    ImageEditor, ImageFetcherPort, ProgressFn,
};
pub use infrastructure::{
    DiskByteCache, HttpFetcher, LoaderConfig, MemoryImageCache, SetupError, StandardDecoder,
    TieredImageCache,
};
pub use manager::{LoadManager, LoadTask, TaskRegistry};

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
