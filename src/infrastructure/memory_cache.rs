//! In-memory LRU tier for decoded images.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::domain::entities::{CacheKey, CachedImage};
use crate::infrastructure::config::DEFAULT_MEMORY_CAPACITY;

/// Fast tier: decoded (possibly edited) images behind an LRU.
/// Thread-safe and optimized for frequent reads.
pub struct MemoryImageCache {
    entries: RwLock<LruCache<CacheKey, CachedImage>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryImageCache {
    /// Creates a cache holding up to `capacity` images.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Looks up a key, promoting it in the LRU.
    pub async fn get(&self, key: &CacheKey) -> Option<CachedImage> {
        let mut entries = self.entries.write().await;
        if let Some(image) = entries.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "memory tier hit");
            Some(image.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "memory tier miss");
            None
        }
    }

    /// Peeks at a key without promoting it. Use in read-only contexts to
    /// avoid the write lock.
    pub async fn peek(&self, key: &CacheKey) -> Option<CachedImage> {
        self.entries.read().await.peek(key).cloned()
    }

    /// Inserts or replaces the image under the key.
    pub async fn put(&self, key: CacheKey, image: CachedImage) {
        debug!(key = %key, edited = image.edit_key.is_some(), "storing image in memory tier");
        self.entries.write().await.put(key, image);
    }

    /// Removes the key.
    pub async fn evict(&self, key: &CacheKey) {
        if self.entries.write().await.pop(key).is_some() {
            debug!(key = %key, "evicted from memory tier");
        }
    }

    /// Drops every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
        debug!("cleared memory tier");
    }

    /// Best-effort entry count; may lag concurrent modifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.try_read().map_or(0, |entries| entries.len())
    }

    /// Returns true when no entries are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns hit/miss statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: self.len(),
        }
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

impl std::fmt::Debug for MemoryImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImageCache")
            .field("size", &self.len())
            .finish_non_exhaustive()
    }
}

/// Statistics about memory tier performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of hits.
    pub hits: u64,
    /// Number of misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "memory tier: {} images, {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.hit_rate, self.hits, self.misses
        )
    }
}
