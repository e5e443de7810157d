//! Port definition for the tiered image cache.

use bytes::Bytes;

use crate::domain::entities::{CacheKey, CacheTier, CachedImage};

/// Answer to a tiered cache query.
///
/// The shape must match the queried tier: a memory query answers
/// `Memory` or `Miss`, a disk query answers `Disk` or `Miss`. The
/// orchestrator treats a mismatched shape as a contract violation.
#[derive(Debug, Clone)]
pub enum CacheQueryResult {
    /// Decoded image found in the memory tier.
    Memory(CachedImage),
    /// Raw source bytes found in the disk tier.
    Disk(Bytes),
    /// Nothing cached in the queried tier(s).
    Miss,
}

/// Port for tiered cache operations.
/// Implementations must be thread-safe and own their internal synchronization.
#[async_trait::async_trait]
pub trait ImageCachePort: Send + Sync {
    /// Queries the given tier(s) for the key. Memory queries resolve
    /// immediately; disk queries may suspend.
    async fn query(&self, key: &CacheKey, tier: CacheTier) -> CacheQueryResult;

    /// Stores an image and/or its raw bytes under the key, limited to the
    /// given tier scope. Fire-and-forget: failures are the implementation's
    /// concern, and durability is best-effort ("eventually cached").
    async fn store(
        &self,
        image: Option<CachedImage>,
        bytes: Option<Bytes>,
        key: &CacheKey,
        scope: CacheTier,
    );

    /// Removes the key from the given tier(s).
    async fn evict(&self, key: &CacheKey, scope: CacheTier);

    /// Clears all tiers.
    async fn clear(&self);
}
