//! Sticker compositing: fit to the dimension limit, then encode within the byte budget
//!
//! The size-fit loop starts at `max_quality` and lowers quality by
//! `quality_step` until a candidate fits `max_bytes`. It either returns a
//! candidate within budget or fails with [`StickerError::CompressionLimit`]
//! once the floor has been tried; it never hands back an oversize payload.

mod encoder;
mod resize;

pub use encoder::{
    encoder_for, is_webp_container, PngStickerEncoder, StickerEncoder, WebPStickerEncoder,
};
pub use resize::{fit_dimensions, resize_to_fit};

use crate::{
    config::CompositionLimits,
    error::{Result, StickerError},
    services::{ProcessingStage, ProgressTracker},
    types::RasterImage,
};
use tracing::{debug, instrument, warn};

/// Accepted output of the size-fit loop
#[derive(Debug, Clone)]
pub struct EncodedSticker {
    pub bytes: Vec<u8>,
    pub quality: u8,
    /// Encodes performed, including the accepted one
    pub attempts: u32,
}

/// Resizes and encodes rasters under a set of [`CompositionLimits`]
pub struct StickerCompositor {
    limits: CompositionLimits,
    encoder: Box<dyn StickerEncoder>,
}

impl std::fmt::Debug for StickerCompositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StickerCompositor")
            .field("limits", &self.limits)
            .field("format", &self.encoder.format())
            .finish()
    }
}

impl StickerCompositor {
    /// # Errors
    /// Invalid limits.
    pub fn new(limits: CompositionLimits, encoder: Box<dyn StickerEncoder>) -> Result<Self> {
        limits.validate()?;
        Ok(Self { limits, encoder })
    }

    /// Compositor with the lossless-at-max WebP encoder
    ///
    /// # Errors
    /// Invalid limits.
    pub fn webp(limits: CompositionLimits) -> Result<Self> {
        Self::new(limits, Box::new(WebPStickerEncoder::default()))
    }

    #[must_use]
    pub fn limits(&self) -> &CompositionLimits {
        &self.limits
    }

    #[must_use]
    pub fn encoder(&self) -> &dyn StickerEncoder {
        self.encoder.as_ref()
    }

    /// Scale down to `max_dimension`; never enlarges
    ///
    /// # Errors
    /// Empty images.
    pub fn resize(&self, image: RasterImage) -> Result<RasterImage> {
        resize_to_fit(image, self.limits.max_dimension)
    }

    /// Run the size-fit loop on an already resized raster
    ///
    /// # Errors
    /// - `CompressionLimit` when the floor quality is still over budget
    /// - `Encode` on codec failure
    #[instrument(skip(self, image, tracker), fields(width = image.width(), height = image.height(), limit = self.limits.max_bytes))]
    pub fn encode_within_limit(
        &self,
        image: &RasterImage,
        tracker: &mut ProgressTracker,
    ) -> Result<EncodedSticker> {
        let mut quality = self.limits.max_quality;
        let mut attempts = 0u32;
        let mut smallest = usize::MAX;

        loop {
            let candidate = self.encoder.encode(image.as_rgba(), quality)?;
            attempts += 1;
            smallest = smallest.min(candidate.len());
            tracker.report_stage(ProcessingStage::Encoded {
                quality,
                bytes: candidate.len(),
            });

            if candidate.len() <= self.limits.max_bytes {
                debug!(quality, attempts, bytes = candidate.len(), "Candidate within budget");
                return Ok(EncodedSticker {
                    bytes: candidate,
                    quality,
                    attempts,
                });
            }

            if quality <= self.limits.quality_floor || !self.encoder.is_quality_sensitive() {
                warn!(
                    quality,
                    attempts,
                    smallest,
                    limit = self.limits.max_bytes,
                    "Quality floor reached without meeting byte budget"
                );
                return Err(StickerError::CompressionLimit {
                    limit: self.limits.max_bytes,
                    smallest,
                    quality,
                });
            }

            debug!(quality, bytes = candidate.len(), "Candidate over budget, lowering quality");
            quality = quality
                .saturating_sub(self.limits.quality_step)
                .max(self.limits.quality_floor);
        }
    }

    /// Resize then encode
    ///
    /// # Errors
    /// As [`Self::resize`] and [`Self::encode_within_limit`].
    pub fn compose(&self, image: RasterImage, tracker: &mut ProgressTracker) -> Result<(RasterImage, EncodedSticker)> {
        let resized = self.resize(image)?;
        tracker.report_stage(ProcessingStage::Resized);
        let encoded = self.encode_within_limit(&resized, tracker)?;
        Ok((resized, encoded))
    }
}
