//! Persistent tier: raw source bytes on disk.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::SystemTime;

use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

use crate::domain::entities::CacheKey;

const ENTRY_EXTENSION: &str = "img";

/// Disk tier holding the raw bytes an image was decoded from, one file per
/// cache key, trimmed least-recently-accessed-first when over budget.
pub struct DiskByteCache {
    dir: PathBuf,
    budget: u64,
    used: AtomicU64,
    entries: AtomicUsize,
}

impl DiskByteCache {
    /// Opens (creating if needed) a disk cache in `dir` with a byte `budget`.
    ///
    /// # Errors
    /// Returns the I/O error if the directory cannot be created or scanned.
    pub async fn new(dir: PathBuf, budget: u64) -> io::Result<Self> {
        fs::create_dir_all(&dir).await?;

        let mut used = 0u64;
        let mut entries = 0usize;
        let mut listing = fs::read_dir(&dir).await?;
        while let Ok(Some(entry)) = listing.next_entry().await {
            if is_cache_entry(&entry.path())
                && let Ok(meta) = entry.metadata().await
            {
                used += meta.len();
                entries += 1;
            }
        }

        let cache = Self {
            dir,
            budget,
            used: AtomicU64::new(used),
            entries: AtomicUsize::new(entries),
        };
        cache.trim_to_budget().await;
        Ok(cache)
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir
            .join(format!("{}.{ENTRY_EXTENSION}", key.as_str()))
    }

    /// Reads the bytes stored under the key, if any.
    pub async fn get(&self, key: &CacheKey) -> Option<Bytes> {
        let path = self.entry_path(key);
        match fs::read(&path).await {
            Ok(bytes) => {
                trace!(key = %key, size = bytes.len(), "disk tier hit");
                Some(Bytes::from(bytes))
            }
            Err(_) => {
                trace!(key = %key, "disk tier miss");
                None
            }
        }
    }

    /// Writes (or replaces) the bytes under the key, then trims if the cache
    /// went over budget.
    ///
    /// # Errors
    /// Returns the I/O error if the file cannot be written.
    pub async fn put(&self, key: &CacheKey, bytes: &[u8]) -> io::Result<()> {
        let path = self.entry_path(key);
        let previous = fs::metadata(&path).await.map(|m| m.len()).ok();

        let mut file = fs::File::create(&path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        let size = bytes.len() as u64;
        match previous {
            Some(old) if size >= old => {
                self.used.fetch_add(size - old, Ordering::Relaxed);
            }
            Some(old) => {
                self.used.fetch_sub(old - size, Ordering::Relaxed);
            }
            None => {
                self.used.fetch_add(size, Ordering::Relaxed);
                self.entries.fetch_add(1, Ordering::Relaxed);
            }
        }
        debug!(key = %key, size = size, "stored bytes in disk tier");

        self.trim_to_budget().await;
        Ok(())
    }

    /// Removes the key's entry, if present.
    pub async fn evict(&self, key: &CacheKey) {
        let path = self.entry_path(key);
        let size = fs::metadata(&path).await.map(|m| m.len()).ok();
        match fs::remove_file(&path).await {
            Ok(()) => {
                if let Some(size) = size {
                    self.used.fetch_sub(size, Ordering::Relaxed);
                    self.entries.fetch_sub(1, Ordering::Relaxed);
                }
                debug!(key = %key, "evicted from disk tier");
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(key = %key, error = %err, "failed to evict from disk tier"),
        }
    }

    /// Removes every entry.
    ///
    /// # Errors
    /// Returns the I/O error if the directory cannot be read.
    pub async fn clear(&self) -> io::Result<()> {
        let mut listing = fs::read_dir(&self.dir).await?;
        while let Some(entry) = listing.next_entry().await? {
            let path = entry.path();
            if is_cache_entry(&path) && fs::remove_file(&path).await.is_err() {
                warn!(path = %path.display(), "failed to remove disk tier entry");
            }
        }
        self.used.store(0, Ordering::Relaxed);
        self.entries.store(0, Ordering::Relaxed);
        debug!("cleared disk tier");
        Ok(())
    }

    /// Returns true if the key has an entry on disk.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        fs::try_exists(&self.entry_path(key)).await.unwrap_or(false)
    }

    /// Bytes currently used.
    #[must_use]
    pub fn used(&self) -> u64 {
        self.used.load(Ordering::Relaxed)
    }

    /// Number of entries currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.load(Ordering::Relaxed)
    }

    /// Returns true when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deletes oldest-accessed entries until usage drops to budget minus a
    /// 10% headroom. Called after scans and writes.
    async fn trim_to_budget(&self) {
        let used = self.used();
        if used <= self.budget {
            return;
        }
        debug!(used = used, budget = self.budget, "disk tier over budget, trimming");

        let Ok(mut listing) = fs::read_dir(&self.dir).await else {
            return;
        };
        let mut files: Vec<(PathBuf, SystemTime, u64)> = Vec::new();
        while let Ok(Some(entry)) = listing.next_entry().await {
            let path = entry.path();
            if !is_cache_entry(&path) {
                continue;
            }
            if let Ok(meta) = entry.metadata().await {
                let accessed = meta.accessed().unwrap_or(SystemTime::UNIX_EPOCH);
                files.push((path, accessed, meta.len()));
            }
        }
        files.sort_by_key(|(_, accessed, _)| *accessed);

        let target = used - self.budget + self.budget / 10;
        let mut freed = 0u64;
        let mut removed = 0usize;
        for (path, _, size) in files {
            if freed >= target {
                break;
            }
            if let Err(err) = fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %err, "failed to trim disk tier entry");
            } else {
                freed += size;
                removed += 1;
            }
        }
        self.used.fetch_sub(freed, Ordering::Relaxed);
        self.entries.fetch_sub(removed, Ordering::Relaxed);
        debug!(freed = freed, removed = removed, "disk tier trim complete");
    }
}

impl std::fmt::Debug for DiskByteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskByteCache")
            .field("dir", &self.dir)
            .field("budget", &self.budget)
            .field("used", &self.used())
            .finish()
    }
}

fn is_cache_entry(path: &std::path::Path) -> bool {
    path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_cache(budget: u64) -> (DiskByteCache, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = DiskByteCache::new(dir.path().to_path_buf(), budget)
            .await
            .unwrap();
        (cache, dir)
    }

    #[tokio::test]
    async fn put_then_get() {
        let (cache, _dir) = open_cache(1024 * 1024).await;
        let key = CacheKey::new("a");

        cache.put(&key, b"raw image bytes").await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_ref(), b"raw image bytes");
    }

    #[tokio::test]
    async fn miss_on_unknown_key() {
        let (cache, _dir) = open_cache(1024).await;
        assert!(cache.get(&CacheKey::new("missing")).await.is_none());
    }

    #[tokio::test]
    async fn evict_removes_the_entry() {
        let (cache, _dir) = open_cache(1024).await;
        let key = CacheKey::new("a");

        cache.put(&key, b"data").await.unwrap();
        assert!(cache.contains(&key).await);

        cache.evict(&key).await;
        assert!(!cache.contains(&key).await);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let (cache, _dir) = open_cache(1024).await;
        cache.put(&CacheKey::new("a"), b"one").await.unwrap();
        cache.put(&CacheKey::new("b"), b"two").await.unwrap();
        assert_eq!(cache.len(), 2);

        cache.clear().await.unwrap();
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.used(), 0);
    }

    #[tokio::test]
    async fn accounting_tracks_replacements() {
        let (cache, _dir) = open_cache(1024).await;
        let key = CacheKey::new("a");

        cache.put(&key, b"hello").await.unwrap();
        assert_eq!(cache.used(), 5);

        cache.put(&key, b"hi").await.unwrap();
        assert_eq!(cache.used(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn trim_drops_oldest_entries_when_over_budget() {
        let (cache, _dir) = open_cache(10).await;

        cache.put(&CacheKey::new("old"), b"123456").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        cache.put(&CacheKey::new("new"), b"123456").await.unwrap();

        assert_eq!(cache.len(), 1);
        assert!(cache.get(&CacheKey::new("new")).await.is_some());
        assert!(cache.get(&CacheKey::new("old")).await.is_none());
    }

    #[tokio::test]
    async fn reopen_rescans_existing_entries() {
        let dir = TempDir::new().unwrap();
        {
            let cache = DiskByteCache::new(dir.path().to_path_buf(), 1024)
                .await
                .unwrap();
            cache.put(&CacheKey::new("a"), b"12345").await.unwrap();
        }

        let cache = DiskByteCache::new(dir.path().to_path_buf(), 1024)
            .await
            .unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.used(), 5);
    }
}
