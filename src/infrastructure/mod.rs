//! Default collaborator implementations.

/// Loader configuration.
pub mod config;
/// Byte-to-image decoding.
pub mod decoder;
/// Disk byte cache.
pub mod disk_cache;
/// HTTP fetcher.
pub mod http_fetcher;
/// In-memory LRU cache.
pub mod memory_cache;
/// Tiered cache facade.
pub mod tiered_cache;

pub use config::LoaderConfig;
pub use decoder::StandardDecoder;
pub use disk_cache::DiskByteCache;
pub use http_fetcher::HttpFetcher;
pub use memory_cache::{CacheStats, MemoryImageCache};
pub use tiered_cache::TieredImageCache;

use thiserror::Error;

/// Errors building the default infrastructure stack.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The disk cache directory could not be prepared.
    #[error("failed to prepare disk cache: {0}")]
    DiskCache(#[from] std::io::Error),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}
