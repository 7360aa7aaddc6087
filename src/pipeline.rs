//! Unified sticker pipeline
//!
//! `StickerPipeline` chains decode → background removal → resize → size-fit
//! encode. The CLI and the bot both go through it so they produce identical
//! stickers for identical inputs.

use crate::{
    compositor::{encoder_for, StickerCompositor, StickerEncoder},
    config::PipelineConfig,
    error::{Result, StickerError},
    removal::BackgroundRemover,
    services::{ImageIOService, NoOpProgressReporter, ProcessingStage, ProgressReporter, ProgressTracker},
    types::{ProcessingTimings, RasterImage, StickerAsset},
};
use instant::Instant;
use log::{debug, info, warn};
use std::path::Path;
use std::sync::Arc;
use tracing::{info as trace_info, instrument, span, Level};

/// Result for one input of a batch, in input order
#[derive(Debug)]
pub struct ImageOutcome {
    /// Zero-based position in the batch
    pub index: usize,
    pub result: Result<StickerAsset>,
}

impl ImageOutcome {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Stateless, reusable processing pipeline
pub struct StickerPipeline {
    config: PipelineConfig,
    remover: BackgroundRemover,
    compositor: StickerCompositor,
    reporter: Arc<dyn ProgressReporter>,
}

impl std::fmt::Debug for StickerPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StickerPipeline")
            .field("config", &self.config)
            .field("compositor", &self.compositor)
            .finish_non_exhaustive()
    }
}

impl StickerPipeline {
    /// Create a pipeline with the encoder matching `config.format`
    ///
    /// # Errors
    /// Invalid configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let encoder = encoder_for(config.format, config.lossless_at_max);
        Self::with_encoder(config, encoder)
    }

    /// Create a pipeline with a custom encoder (mocks, alternative codecs)
    ///
    /// # Errors
    /// Invalid configuration.
    pub fn with_encoder(config: PipelineConfig, encoder: Box<dyn StickerEncoder>) -> Result<Self> {
        config.validate()?;
        debug!(
            "Sticker pipeline: strategy={}, max_dimension={}, max_bytes={}, format={:?}",
            config.strategy.name(),
            config.limits.max_dimension,
            config.limits.max_bytes,
            encoder.format()
        );
        Ok(Self {
            remover: BackgroundRemover::new(config.strategy.clone()),
            compositor: StickerCompositor::new(config.limits.clone(), encoder)?,
            reporter: Arc::new(NoOpProgressReporter),
            config,
        })
    }

    /// Attach a progress reporter
    #[must_use]
    pub fn with_progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Decode and process raw image bytes
    ///
    /// # Examples
    /// ```rust,no_run
    /// use stickerbot::{PipelineConfig, StickerPipeline};
    ///
    /// # fn example(png: Vec<u8>) -> stickerbot::Result<()> {
    /// let pipeline = StickerPipeline::new(PipelineConfig::default())?;
    /// let sticker = pipeline.process_bytes(&png)?;
    /// assert!(sticker.len() <= 512 * 1024);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// - `Decode` for unreadable input
    /// - `CompressionLimit` when no quality fits the byte budget
    /// - `Encode` on codec failure
    pub fn process_bytes(&self, bytes: &[u8]) -> Result<StickerAsset> {
        let mut tracker = ProgressTracker::new(Arc::clone(&self.reporter));
        tracker.report_stage(ProcessingStage::Received);

        let decode_start = Instant::now();
        let image = match RasterImage::decode(bytes) {
            Ok(image) => image,
            Err(e) => {
                tracker.report_failure(&e.to_string());
                return Err(e);
            },
        };
        let decode_ms = decode_start.elapsed().as_millis() as u64;
        if let Some(format) = ImageIOService::detect_format(bytes) {
            debug!("Decoded {} input: {}x{}", format, image.width(), image.height());
        }
        tracker.report_stage(ProcessingStage::Decoded);

        self.run(image, tracker, decode_ms)
    }

    /// Process an already decoded raster
    ///
    /// # Errors
    /// `CompressionLimit` or `Encode`, as for [`Self::process_bytes`].
    pub fn process_image(&self, image: RasterImage) -> Result<StickerAsset> {
        let mut tracker = ProgressTracker::new(Arc::clone(&self.reporter));
        tracker.report_stage(ProcessingStage::Received);
        tracker.report_stage(ProcessingStage::Decoded);
        self.run(image, tracker, 0)
    }

    /// Read and process an image file (or stdin for `-`)
    ///
    /// # Errors
    /// `Io` when the file cannot be read, otherwise as [`Self::process_bytes`].
    pub fn process_file<P: AsRef<Path>>(&self, path: P) -> Result<StickerAsset> {
        let bytes = ImageIOService::read_bytes(path)?;
        self.process_bytes(&bytes)
    }

    /// Read an async stream to the end and process it
    ///
    /// # Errors
    /// `Io` on read failure, otherwise as [`Self::process_bytes`].
    pub async fn process_reader<R: tokio::io::AsyncRead + Unpin>(
        &self,
        mut reader: R,
    ) -> Result<StickerAsset> {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        AsyncReadExt::read_to_end(&mut reader, &mut buffer).await?;
        self.process_bytes(&buffer)
    }

    #[instrument(
        skip(self, image, tracker),
        fields(
            strategy = self.config.strategy.name(),
            dimensions = %format!("{}x{}", image.width(), image.height())
        )
    )]
    fn run(&self, image: RasterImage, mut tracker: ProgressTracker, decode_ms: u64) -> Result<StickerAsset> {
        let total_start = Instant::now();
        let original_dimensions = image.dimensions();
        let mut timings = ProcessingTimings {
            decode_ms,
            ..ProcessingTimings::default()
        };

        let removal_start = Instant::now();
        let (image, stats) = self.remover.remove(image);
        timings.removal_ms = removal_start.elapsed().as_millis() as u64;
        tracker.report_stage(ProcessingStage::BackgroundRemoved);

        let resize_start = Instant::now();
        let resized = {
            let _span = span!(Level::DEBUG, "resize", max_dimension = self.config.limits.max_dimension).entered();
            self.compositor.resize(image)
        };
        let resized = match resized {
            Ok(resized) => resized,
            Err(e) => {
                tracker.report_failure(&e.to_string());
                return Err(e);
            },
        };
        timings.resize_ms = resize_start.elapsed().as_millis() as u64;
        tracker.report_stage(ProcessingStage::Resized);

        let encode_start = Instant::now();
        let encoded = match self.compositor.encode_within_limit(&resized, &mut tracker) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Sticker encoding failed: {}", e);
                tracker.report_failure(&e.to_string());
                return Err(e);
            },
        };
        timings.encode_ms = encode_start.elapsed().as_millis() as u64;
        timings.total_ms = decode_ms + total_start.elapsed().as_millis() as u64;

        tracker.report_stage(ProcessingStage::Done);
        tracker.report_completion(&timings);

        trace_info!(
            bytes = encoded.bytes.len(),
            quality = encoded.quality,
            attempts = encoded.attempts,
            removed = stats.removed + stats.eroded,
            total_ms = timings.total_ms,
            "Sticker ready"
        );

        Ok(StickerAsset {
            format: self.compositor.encoder().format(),
            dimensions: resized.dimensions(),
            original_dimensions,
            quality: encoded.quality,
            attempts: encoded.attempts,
            transparent_pixels: resized.count_transparent(),
            timings,
            bytes: encoded.bytes,
        })
    }

    /// Process on the blocking thread pool so async callers are not stalled
    ///
    /// # Errors
    /// As [`Self::process_bytes`]; `Internal` if the blocking task panics.
    pub async fn process_async(self: &Arc<Self>, bytes: Vec<u8>) -> Result<StickerAsset> {
        let pipeline = Arc::clone(self);
        tokio::task::spawn_blocking(move || pipeline.process_bytes(&bytes))
            .await
            .map_err(|e| StickerError::internal(format!("Processing task failed: {e}")))?
    }

    /// Like [`Self::process_async`] but bounded by the configured per-image timeout
    ///
    /// On timeout the blocking work is abandoned; its result is discarded.
    ///
    /// # Errors
    /// `Timeout` past the deadline, otherwise as [`Self::process_async`].
    pub async fn process_with_timeout(self: &Arc<Self>, bytes: Vec<u8>) -> Result<StickerAsset> {
        let deadline = self.config.per_image_timeout();
        match tokio::time::timeout(deadline, self.process_async(bytes)).await {
            Ok(result) => result,
            Err(_) => Err(StickerError::timeout(deadline)),
        }
    }

    /// Process inputs one at a time; a failing image never aborts the batch
    pub async fn process_batch(self: &Arc<Self>, inputs: Vec<Vec<u8>>) -> Vec<ImageOutcome> {
        let total = inputs.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, bytes) in inputs.into_iter().enumerate() {
            let result = self.process_with_timeout(bytes).await;
            match &result {
                Ok(asset) => debug!("Image {}/{} done: {} bytes", index + 1, total, asset.len()),
                Err(e) => warn!("Image {}/{} skipped: {}", index + 1, total, e),
            }
            outcomes.push(ImageOutcome { index, result });
        }

        let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
        info!("Batch finished: {}/{} stickers produced", succeeded, total);
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compositor::StickerEncoder,
        services::RecordingProgressReporter,
        types::StickerFormat,
    };
    use image::{Rgba, RgbaImage};
    use std::time::Duration;

    fn png_bytes(image: &RgbaImage) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        image.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    fn red_square_on_green(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let inside = x > width / 4 && x < 3 * width / 4 && y > height / 4 && y < 3 * height / 4;
            if inside {
                Rgba([220, 20, 20, 255])
            } else {
                Rgba([0, 255, 0, 255])
            }
        })
    }

    struct SlowEncoder(Duration);

    impl StickerEncoder for SlowEncoder {
        fn format(&self) -> StickerFormat {
            StickerFormat::WebP
        }

        fn encode(&self, _image: &RgbaImage, _quality: u8) -> Result<Vec<u8>> {
            std::thread::sleep(self.0);
            Ok(vec![1, 2, 3])
        }
    }

    #[test]
    fn test_process_bytes_reports_every_stage() {
        let recorder = Arc::new(RecordingProgressReporter::new());
        let pipeline = StickerPipeline::new(PipelineConfig::default())
            .unwrap()
            .with_progress_reporter(recorder.clone());

        let asset = pipeline.process_bytes(&png_bytes(&red_square_on_green(64, 64))).unwrap();
        assert_eq!(asset.format, StickerFormat::WebP);
        assert_eq!(asset.dimensions, (64, 64));
        assert!(asset.transparent_pixels > 0);

        let stages = recorder.stages();
        assert_eq!(stages.first(), Some(&ProcessingStage::Received));
        assert_eq!(stages.get(1), Some(&ProcessingStage::Decoded));
        assert_eq!(stages.get(2), Some(&ProcessingStage::BackgroundRemoved));
        assert_eq!(stages.get(3), Some(&ProcessingStage::Resized));
        assert_eq!(stages.last(), Some(&ProcessingStage::Done));
        assert_eq!(recorder.completions(), 1);
    }

    #[test]
    fn test_decode_failure_ends_in_failed() {
        let recorder = Arc::new(RecordingProgressReporter::new());
        let pipeline = StickerPipeline::new(PipelineConfig::default())
            .unwrap()
            .with_progress_reporter(recorder.clone());

        let err = pipeline.process_bytes(b"garbage").unwrap_err();
        assert!(matches!(err, StickerError::Decode(_)));
        assert_eq!(
            recorder.stages(),
            vec![ProcessingStage::Received, ProcessingStage::Failed]
        );
        assert_eq!(recorder.errors().len(), 1);
    }

    #[test]
    fn test_png_output_format() {
        let config = PipelineConfig::builder()
            .format(StickerFormat::Png)
            .build()
            .unwrap();
        let pipeline = StickerPipeline::new(config).unwrap();
        let asset = pipeline
            .process_image(RasterImage::from_rgba(red_square_on_green(32, 32)))
            .unwrap();
        assert_eq!(asset.format, StickerFormat::Png);
        assert_eq!(image::guess_format(&asset.bytes).unwrap(), image::ImageFormat::Png);
    }

    #[tokio::test]
    async fn test_process_reader() {
        let pipeline = StickerPipeline::new(PipelineConfig::default()).unwrap();
        let bytes = png_bytes(&red_square_on_green(16, 16));
        let asset = pipeline.process_reader(std::io::Cursor::new(bytes)).await.unwrap();
        assert_eq!(asset.dimensions, (16, 16));
    }

    #[tokio::test]
    async fn test_timeout_becomes_per_image_error() {
        let config = PipelineConfig::builder()
            .per_image_timeout(Duration::from_secs(1))
            .build()
            .unwrap();
        let pipeline = Arc::new(
            StickerPipeline::with_encoder(config, Box::new(SlowEncoder(Duration::from_millis(1500)))).unwrap(),
        );

        let err = pipeline
            .process_with_timeout(png_bytes(&red_square_on_green(8, 8)))
            .await
            .unwrap_err();
        assert!(matches!(err, StickerError::Timeout { seconds: 1 }));
        assert!(err.is_per_image());
    }

    #[tokio::test]
    async fn test_batch_continues_past_failures() {
        let pipeline = Arc::new(StickerPipeline::new(PipelineConfig::default()).unwrap());
        let inputs = vec![
            png_bytes(&red_square_on_green(24, 24)),
            b"not an image".to_vec(),
            png_bytes(&red_square_on_green(40, 20)),
        ];

        let outcomes = pipeline.process_batch(inputs).await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert!(matches!(outcomes[1].result, Err(StickerError::Decode(_))));
        assert_eq!(outcomes[2].index, 2);
        assert_eq!(outcomes[2].result.as_ref().unwrap().dimensions, (40, 20));
    }
}
