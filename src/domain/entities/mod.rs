//! Domain entity definitions.

mod image;
mod options;
mod resource;

pub use image::{CacheTier, CachedImage, LoadOutput, LoadResult};
pub use options::LoadOptions;
pub use resource::{CacheKey, ImageResource};
