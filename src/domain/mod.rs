//! Domain layer with core entities and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{
    CacheKey, CacheTier, CachedImage, ImageResource, LoadOptions, LoadOutput, LoadResult,
};
pub use errors::LoadError;
pub use ports::{
    CacheQueryResult, DecodedImage, FetchHandle, FetchRequest, ImageCachePort, ImageDecoderPort,
    ImageEditor, ImageFetcherPort, ProgressFn,
};
