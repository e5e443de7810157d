//! Tiered cache facade over the memory and disk tiers.

use std::sync::Arc;

use bytes::Bytes;
use tracing::warn;

use crate::domain::entities::{CacheKey, CacheTier, CachedImage};
use crate::domain::ports::{CacheQueryResult, ImageCachePort};
use crate::infrastructure::disk_cache::DiskByteCache;
use crate::infrastructure::memory_cache::MemoryImageCache;

/// The default [`ImageCachePort`]: decoded images in memory, raw bytes on
/// disk. Disk writes are spawned fire-and-forget; a failed write costs a
/// re-fetch later, never the current load.
pub struct TieredImageCache {
    memory: Arc<MemoryImageCache>,
    disk: Arc<DiskByteCache>,
}

impl TieredImageCache {
    /// Creates the facade over existing tiers.
    #[must_use]
    pub fn new(memory: Arc<MemoryImageCache>, disk: Arc<DiskByteCache>) -> Self {
        Self { memory, disk }
    }

    /// The memory tier.
    #[must_use]
    pub fn memory(&self) -> &MemoryImageCache {
        &self.memory
    }

    /// The disk tier.
    #[must_use]
    pub fn disk(&self) -> &DiskByteCache {
        &self.disk
    }
}

impl std::fmt::Debug for TieredImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredImageCache")
            .field("memory", &self.memory)
            .field("disk", &self.disk)
            .finish()
    }
}

#[async_trait::async_trait]
impl ImageCachePort for TieredImageCache {
    async fn query(&self, key: &CacheKey, tier: CacheTier) -> CacheQueryResult {
        match tier {
            CacheTier::Memory => self
                .memory
                .get(key)
                .await
                .map_or(CacheQueryResult::Miss, CacheQueryResult::Memory),
            CacheTier::Disk => self
                .disk
                .get(key)
                .await
                .map_or(CacheQueryResult::Miss, CacheQueryResult::Disk),
            CacheTier::Both => {
                if let Some(image) = self.memory.get(key).await {
                    return CacheQueryResult::Memory(image);
                }
                self.disk
                    .get(key)
                    .await
                    .map_or(CacheQueryResult::Miss, CacheQueryResult::Disk)
            }
            CacheTier::None => CacheQueryResult::Miss,
        }
    }

    async fn store(
        &self,
        image: Option<CachedImage>,
        bytes: Option<Bytes>,
        key: &CacheKey,
        scope: CacheTier,
    ) {
        if scope.includes_memory()
            && let Some(image) = image
        {
            self.memory.put(key.clone(), image).await;
        }
        if scope.includes_disk()
            && let Some(bytes) = bytes
        {
            let disk = self.disk.clone();
            let key = key.clone();
            tokio::spawn(async move {
                if let Err(err) = disk.put(&key, &bytes).await {
                    warn!(key = %key, error = %err, "failed to persist bytes to disk tier");
                }
            });
        }
    }

    async fn evict(&self, key: &CacheKey, scope: CacheTier) {
        if scope.includes_memory() {
            self.memory.evict(key).await;
        }
        if scope.includes_disk() {
            self.disk.evict(key).await;
        }
    }

    async fn clear(&self) {
        self.memory.clear().await;
        if let Err(err) = self.disk.clear().await {
            warn!(error = %err, "failed to clear disk tier");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn tiered() -> (TieredImageCache, TempDir) {
        let dir = TempDir::new().unwrap();
        let disk = DiskByteCache::new(dir.path().to_path_buf(), 1024 * 1024)
            .await
            .unwrap();
        (
            TieredImageCache::new(Arc::new(MemoryImageCache::new(8)), Arc::new(disk)),
            dir,
        )
    }

    fn png_bytes() -> Bytes {
        let img = image::DynamicImage::new_rgb8(2, 2);
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        Bytes::from(buf.into_inner())
    }

    async fn wait_for_disk(cache: &TieredImageCache, key: &CacheKey) {
        for _ in 0..200 {
            if cache.disk().contains(key).await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("disk write did not land");
    }

    #[tokio::test]
    async fn query_shape_matches_the_queried_tier() {
        let (cache, _dir) = tiered().await;
        let key = CacheKey::new("a");
        let image = CachedImage::plain(Arc::new(image::DynamicImage::new_rgb8(2, 2)), None);

        cache
            .store(Some(image), Some(png_bytes()), &key, CacheTier::Both)
            .await;
        wait_for_disk(&cache, &key).await;

        assert!(matches!(
            cache.query(&key, CacheTier::Memory).await,
            CacheQueryResult::Memory(_)
        ));
        assert!(matches!(
            cache.query(&key, CacheTier::Disk).await,
            CacheQueryResult::Disk(_)
        ));
    }

    #[tokio::test]
    async fn round_trip_preserves_decoded_content() {
        let (cache, _dir) = tiered().await;
        let key = CacheKey::new("a");
        let bytes = png_bytes();
        let original = image::load_from_memory(&bytes).unwrap();
        let image = CachedImage::plain(Arc::new(original.clone()), Some(image::ImageFormat::Png));

        cache
            .store(Some(image), Some(bytes), &key, CacheTier::Both)
            .await;
        wait_for_disk(&cache, &key).await;

        let CacheQueryResult::Memory(hit) = cache.query(&key, CacheTier::Memory).await else {
            panic!("expected memory hit");
        };
        assert_eq!(hit.image.as_bytes(), original.as_bytes());

        let CacheQueryResult::Disk(raw) = cache.query(&key, CacheTier::Disk).await else {
            panic!("expected disk hit");
        };
        let redecoded = image::load_from_memory(&raw).unwrap();
        assert_eq!(redecoded.as_bytes(), original.as_bytes());
    }

    #[tokio::test]
    async fn memory_scope_leaves_disk_untouched() {
        let (cache, _dir) = tiered().await;
        let key = CacheKey::new("a");
        let image = CachedImage::plain(Arc::new(image::DynamicImage::new_rgb8(2, 2)), None);

        cache
            .store(Some(image), Some(png_bytes()), &key, CacheTier::Memory)
            .await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(matches!(
            cache.query(&key, CacheTier::Memory).await,
            CacheQueryResult::Memory(_)
        ));
        assert!(matches!(
            cache.query(&key, CacheTier::Disk).await,
            CacheQueryResult::Miss
        ));
    }

    #[tokio::test]
    async fn both_query_prefers_memory_then_falls_back_to_disk() {
        let (cache, _dir) = tiered().await;
        let key = CacheKey::new("a");
        let image = CachedImage::plain(Arc::new(image::DynamicImage::new_rgb8(2, 2)), None);

        cache
            .store(
                Some(image),
                Some(png_bytes()),
                &key,
                CacheTier::Both,
            )
            .await;
        wait_for_disk(&cache, &key).await;

        assert!(matches!(
            cache.query(&key, CacheTier::Both).await,
            CacheQueryResult::Memory(_)
        ));

        cache.evict(&key, CacheTier::Memory).await;
        assert!(matches!(
            cache.query(&key, CacheTier::Both).await,
            CacheQueryResult::Disk(_)
        ));
    }

    #[tokio::test]
    async fn clear_empties_both_tiers() {
        let (cache, _dir) = tiered().await;
        let key = CacheKey::new("a");
        let image = CachedImage::plain(Arc::new(image::DynamicImage::new_rgb8(2, 2)), None);

        cache
            .store(Some(image), Some(png_bytes()), &key, CacheTier::Both)
            .await;
        wait_for_disk(&cache, &key).await;

        cache.clear().await;
        assert!(matches!(
            cache.query(&key, CacheTier::Both).await,
            CacheQueryResult::Miss
        ));
    }
}
