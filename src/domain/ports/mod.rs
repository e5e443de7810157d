//! Port definitions for the orchestrator's collaborators.

mod cache_port;
mod decoder_port;
mod editor_port;
mod fetcher_port;

pub use cache_port::{CacheQueryResult, ImageCachePort};
pub use decoder_port::{DecodedImage, ImageDecoderPort};
pub use editor_port::ImageEditor;
pub use fetcher_port::{FetchHandle, FetchRequest, ImageFetcherPort, ProgressFn};
