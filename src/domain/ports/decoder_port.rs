//! Port definition for the byte-to-image decoder.

use crate::domain::errors::LoadError;

/// A freshly decoded image together with its sniffed container format.
#[derive(Debug)]
pub struct DecodedImage {
    /// Decoded pixels.
    pub image: image::DynamicImage,
    /// Container format, when it could be determined from the bytes.
    pub format: Option<image::ImageFormat>,
}

/// Port for decoding raw bytes into images.
///
/// Methods are synchronous and CPU-bound; the orchestrator runs them on the
/// blocking pool.
pub trait ImageDecoderPort: Send + Sync {
    /// Decodes raw bytes into an image.
    ///
    /// # Errors
    /// Returns [`LoadError::InvalidImageData`] when the bytes are not a
    /// decodable image.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, LoadError>;

    /// Optional normalization applied after a raw decode (e.g. eager pixel
    /// format conversion), skipped when the request sets `skip_post_decode`.
    ///
    /// # Errors
    /// Returns [`LoadError::InvalidImageData`] when normalization fails.
    fn post_decode(
        &self,
        image: image::DynamicImage,
        bytes: &[u8],
    ) -> Result<image::DynamicImage, LoadError>;

    /// Sniffs the container format without decoding.
    fn sniff_format(&self, bytes: &[u8]) -> Option<image::ImageFormat> {
        let _ = bytes;
        None
    }
}
