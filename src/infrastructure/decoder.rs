//! Standard byte-to-image decoder.

use tracing::trace;

use crate::domain::errors::LoadError;
use crate::domain::ports::{DecodedImage, ImageDecoderPort};

/// Decoder backed by the `image` crate.
///
/// Post-decode normalization eagerly converts to RGBA8, so consumers never
/// pay a per-render pixel format conversion later.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDecoder;

impl StandardDecoder {
    /// Creates the decoder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ImageDecoderPort for StandardDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, LoadError> {
        let format = image::guess_format(bytes).ok();
        let image = image::load_from_memory(bytes)
            .map_err(|err| LoadError::invalid_data(err.to_string()))?;
        trace!(
            width = image.width(),
            height = image.height(),
            format = ?format,
            "decoded image"
        );
        Ok(DecodedImage { image, format })
    }

    fn post_decode(
        &self,
        image: image::DynamicImage,
        _bytes: &[u8],
    ) -> Result<image::DynamicImage, LoadError> {
        if matches!(image, image::DynamicImage::ImageRgba8(_)) {
            return Ok(image);
        }
        Ok(image::DynamicImage::ImageRgba8(image.to_rgba8()))
    }

    fn sniff_format(&self, bytes: &[u8]) -> Option<image::ImageFormat> {
        image::guess_format(bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Vec<u8> {
        let img = image::DynamicImage::new_rgb8(3, 2);
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn decodes_valid_bytes_with_format() {
        let decoded = StandardDecoder::new().decode(&png_bytes()).unwrap();
        assert_eq!(decoded.image.width(), 3);
        assert_eq!(decoded.format, Some(image::ImageFormat::Png));
    }

    #[test]
    fn malformed_bytes_are_invalid_image_data() {
        let err = StandardDecoder::new().decode(b"definitely not an image");
        assert!(matches!(err, Err(LoadError::InvalidImageData { .. })));
    }

    #[test]
    fn post_decode_normalizes_to_rgba8() {
        let decoder = StandardDecoder::new();
        let decoded = decoder.decode(&png_bytes()).unwrap();
        assert!(matches!(decoded.image, image::DynamicImage::ImageRgb8(_)));

        let normalized = decoder.post_decode(decoded.image, &png_bytes()).unwrap();
        assert!(matches!(normalized, image::DynamicImage::ImageRgba8(_)));
    }

    #[test]
    fn sniff_format_matches_decode() {
        let decoder = StandardDecoder::new();
        assert_eq!(
            decoder.sniff_format(&png_bytes()),
            Some(image::ImageFormat::Png)
        );
        assert_eq!(decoder.sniff_format(b"junk"), None);
    }
}
