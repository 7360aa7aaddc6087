//! Sticker encoders
//!
//! The compositor only needs "encode this raster at quality Q". WebP is the
//! production container; PNG is kept for platforms that reject WebP.

use crate::{
    error::{Result, StickerError},
    types::StickerFormat,
};
use image::{
    codecs::png::{CompressionType, FilterType, PngEncoder},
    ExtendedColorType, ImageEncoder, RgbaImage,
};

/// Encoding seam of the compositor
pub trait StickerEncoder: Send + Sync {
    /// Container produced by this encoder
    fn format(&self) -> StickerFormat;

    /// Encode `image` at `quality` (0-100)
    ///
    /// # Errors
    /// `StickerError::Encode` on codec failure.
    fn encode(&self, image: &RgbaImage, quality: u8) -> Result<Vec<u8>>;

    /// Whether output size responds to `quality`; lossless encoders return `false`
    fn is_quality_sensitive(&self) -> bool {
        true
    }
}

/// libwebp-backed encoder
#[derive(Debug, Clone, Copy)]
pub struct WebPStickerEncoder {
    lossless_at_max: bool,
}

impl WebPStickerEncoder {
    /// `lossless_at_max` switches quality 100 to lossless mode
    #[must_use]
    pub fn new(lossless_at_max: bool) -> Self {
        Self { lossless_at_max }
    }
}

impl Default for WebPStickerEncoder {
    fn default() -> Self {
        Self::new(true)
    }
}

impl StickerEncoder for WebPStickerEncoder {
    fn format(&self) -> StickerFormat {
        StickerFormat::WebP
    }

    fn encode(&self, image: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(StickerError::encode("cannot encode an empty image"));
        }

        let lossless = self.lossless_at_max && quality >= 100;
        let encoder = webp::Encoder::from_rgba(image.as_raw(), width, height);
        let memory = encoder
            .encode_simple(lossless, f32::from(quality.min(100)))
            .map_err(|e| StickerError::encode(format!("WebP encoding failed: {e:?}")))?;

        let bytes = memory.to_vec();
        if !is_webp_container(&bytes) {
            return Err(StickerError::encode("Invalid WebP/RIFF signature in encoder output"));
        }

        log::debug!(
            "WebP {}x{} q={} lossless={} -> {} bytes",
            width,
            height,
            quality,
            lossless,
            bytes.len()
        );
        Ok(bytes)
    }
}

/// Lossless PNG encoder; quality is ignored
#[derive(Debug, Clone, Copy, Default)]
pub struct PngStickerEncoder;

impl StickerEncoder for PngStickerEncoder {
    fn format(&self) -> StickerFormat {
        StickerFormat::Png
    }

    fn encode(&self, image: &RgbaImage, _quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::Adaptive)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| StickerError::encode(format!("PNG encoding failed: {e}")))?;
        Ok(buffer)
    }

    fn is_quality_sensitive(&self) -> bool {
        false
    }
}

/// Build the encoder for a configured container
#[must_use]
pub fn encoder_for(format: StickerFormat, lossless_at_max: bool) -> Box<dyn StickerEncoder> {
    match format {
        StickerFormat::WebP => Box::new(WebPStickerEncoder::new(lossless_at_max)),
        StickerFormat::Png => Box::new(PngStickerEncoder),
    }
}

/// RIFF header with a `WEBP` form type
#[must_use]
pub fn is_webp_container(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && bytes.get(0..4) == Some(b"RIFF") && bytes.get(8..12) == Some(b"WEBP")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn noisy(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let v = (x.wrapping_mul(31) ^ y.wrapping_mul(17)) as u8;
            Rgba([v, v.wrapping_mul(3), 255 - v, if (x + y) % 7 == 0 { 0 } else { 255 }])
        })
    }

    #[test]
    fn test_webp_output_is_riff() {
        let encoder = WebPStickerEncoder::default();
        let bytes = encoder.encode(&noisy(64, 48), 80).unwrap();
        assert!(is_webp_container(&bytes));

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_webp_lossless_at_max_keeps_pixels() {
        let source = noisy(16, 16);
        let bytes = WebPStickerEncoder::new(true).encode(&source, 100).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        for (a, b) in source.pixels().zip(decoded.pixels()) {
            // fully transparent pixels may have their color discarded
            if a.0[3] == 0 {
                assert_eq!(b.0[3], 0);
            } else {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn test_webp_lower_quality_is_smaller() {
        let encoder = WebPStickerEncoder::new(false);
        let image = noisy(128, 128);
        let high = encoder.encode(&image, 95).unwrap();
        let low = encoder.encode(&image, 10).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_empty_image_rejected() {
        let err = WebPStickerEncoder::default()
            .encode(&RgbaImage::new(0, 0), 90)
            .unwrap_err();
        assert!(matches!(err, StickerError::Encode(_)));
    }

    #[test]
    fn test_png_encoder() {
        let encoder = encoder_for(StickerFormat::Png, true);
        assert_eq!(encoder.format(), StickerFormat::Png);
        assert!(!encoder.is_quality_sensitive());
        let bytes = encoder.encode(&noisy(10, 10), 0).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Png);
    }

    #[test]
    fn test_container_check() {
        assert!(!is_webp_container(b"RIFF\0\0\0\0WAVE"));
        assert!(!is_webp_container(b"RIFF"));
        assert!(is_webp_container(b"RIFF\x04\0\0\0WEBPVP8 "));
    }
}
