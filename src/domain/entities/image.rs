//! Decoded-image entities and cache provenance.

use std::sync::Arc;

use bytes::Bytes;

use crate::domain::errors::LoadError;

/// Cache tier selector, doubling as the provenance tag on results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTier {
    /// In-memory tier only.
    Memory,
    /// On-disk tier only.
    Disk,
    /// Both tiers.
    Both,
    /// No tier (as provenance: the result came from the network).
    None,
}

impl CacheTier {
    /// Returns true if the tier includes the memory level.
    #[must_use]
    pub const fn includes_memory(self) -> bool {
        matches!(self, Self::Memory | Self::Both)
    }

    /// Returns true if the tier includes the disk level.
    #[must_use]
    pub const fn includes_disk(self) -> bool {
        matches!(self, Self::Disk | Self::Both)
    }
}

impl std::fmt::Display for CacheTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Disk => write!(f, "disk"),
            Self::Both => write!(f, "both"),
            Self::None => write!(f, "none"),
        }
    }
}

/// A decoded image as held by the memory tier.
///
/// Carries the edit stamp: the identity key of the editor that produced it,
/// if any, so a repeat request with the same editor can short-circuit without
/// re-editing. A different editor never re-edits from stamped pixels.
#[derive(Debug, Clone)]
pub struct CachedImage {
    /// The decoded (and possibly edited) pixels.
    pub image: Arc<image::DynamicImage>,
    /// Identity key of the editor that produced this image, if any.
    pub edit_key: Option<String>,
    /// Container format the source bytes were decoded from, if known.
    pub source_format: Option<image::ImageFormat>,
}

impl CachedImage {
    /// Wraps a plain decoded image with no edit stamp.
    #[must_use]
    pub fn plain(image: Arc<image::DynamicImage>, format: Option<image::ImageFormat>) -> Self {
        Self {
            image,
            edit_key: None,
            source_format: format,
        }
    }

    /// Wraps an edited image, stamping it with the editor's key.
    #[must_use]
    pub fn edited(
        image: Arc<image::DynamicImage>,
        edit_key: impl Into<String>,
        format: Option<image::ImageFormat>,
    ) -> Self {
        Self {
            image,
            edit_key: Some(edit_key.into()),
            source_format: format,
        }
    }

    /// Returns true if this image was produced by the editor with `key`.
    #[must_use]
    pub fn stamped_with(&self, key: &str) -> bool {
        self.edit_key.as_deref() == Some(key)
    }
}

/// Successful terminal outcome of a load.
#[derive(Debug, Clone)]
pub struct LoadOutput {
    /// The delivered image.
    pub image: CachedImage,
    /// Raw source bytes, when the byte path was taken.
    pub bytes: Option<Bytes>,
    /// Which tier(s), if any, satisfied the load.
    pub tier: CacheTier,
}

/// Terminal result delivered at most once per load task.
pub type LoadResult = Result<LoadOutput, LoadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_level_predicates() {
        assert!(CacheTier::Memory.includes_memory());
        assert!(!CacheTier::Memory.includes_disk());
        assert!(CacheTier::Both.includes_memory());
        assert!(CacheTier::Both.includes_disk());
        assert!(!CacheTier::None.includes_memory());
        assert!(!CacheTier::None.includes_disk());
    }

    #[test]
    fn edit_stamp_matching() {
        let img = Arc::new(image::DynamicImage::new_rgb8(1, 1));
        let plain = CachedImage::plain(img.clone(), None);
        let edited = CachedImage::edited(img, "grayscale", Some(image::ImageFormat::Png));

        assert!(!plain.stamped_with("grayscale"));
        assert!(edited.stamped_with("grayscale"));
        assert!(!edited.stamped_with("blur"));
        assert_eq!(edited.source_format, Some(image::ImageFormat::Png));
    }
}
