//! Configuration for the default infrastructure stack.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const APP_QUALIFIER: &str = "io";
const APP_ORGANIZATION: &str = "oxipix";
const APP_NAME: &str = "oxipix";

/// Default number of decoded images held in memory.
pub const DEFAULT_MEMORY_CAPACITY: usize = 50;

/// Default disk cache budget in bytes (200 MB).
pub const DEFAULT_DISK_BUDGET: u64 = 200 * 1024 * 1024;

/// Configuration for [`LoadManager::with_defaults`](crate::manager::LoadManager::with_defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Maximum decoded images in the memory tier.
    pub memory_capacity: usize,
    /// Maximum disk tier size in bytes.
    pub disk_budget: u64,
    /// Disk tier directory; `None` picks the platform cache location.
    pub disk_dir: Option<PathBuf>,
    /// Maximum concurrent network downloads.
    pub max_concurrent_downloads: usize,
    /// Network request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            disk_budget: DEFAULT_DISK_BUDGET,
            disk_dir: None,
            max_concurrent_downloads: 4,
            timeout_secs: 30,
        }
    }
}

impl LoaderConfig {
    /// Resolves the disk tier directory, falling back to the platform cache
    /// location (or the system temp dir when none is known).
    #[must_use]
    pub fn disk_path(&self) -> PathBuf {
        self.disk_dir.clone().unwrap_or_else(default_disk_dir)
    }
}

/// Platform cache directory for the disk tier.
fn default_disk_dir() -> PathBuf {
    directories::ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME).map_or_else(
        || std::env::temp_dir().join("oxipix").join("images"),
        |dirs| dirs.cache_dir().join("images"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_disk_dir_wins() {
        let config = LoaderConfig {
            disk_dir: Some(PathBuf::from("/tmp/custom")),
            ..LoaderConfig::default()
        };
        assert_eq!(config.disk_path(), PathBuf::from("/tmp/custom"));
    }

    #[test]
    fn default_disk_dir_is_non_empty() {
        let config = LoaderConfig::default();
        assert!(!config.disk_path().as_os_str().is_empty());
    }
}
