#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # stickerbot
//!
//! Turns generated images with a flat backdrop into chat stickers: the
//! backdrop is keyed out to transparency, the result is resized to the
//! platform's sticker dimension and re-encoded as WebP under a hard byte
//! budget.
//!
//! ## Pipeline
//!
//! 1. **Decode** raw bytes into a [`RasterImage`].
//! 2. **Remove the background** with one [`RemovalStrategy`]:
//!    - border-seeded flood fill over pixels near a sampled key color, with an
//!      optional one-pixel erosion of the remaining edge,
//!    - a global key-color match that also clears enclosed regions,
//!    - or a fixed HSL band ([`HueBand::green_screen`] and friends).
//! 3. **Resize** so the longer side is at most 512 px, never upscaling.
//! 4. **Encode** at quality 100 and step the quality down until the sticker
//!    fits the byte budget, or fail with [`StickerError::CompressionLimit`].
//!
//! ```rust,no_run
//! use stickerbot::{PipelineConfig, StickerPipeline};
//!
//! # fn example() -> stickerbot::Result<()> {
//! let pipeline = StickerPipeline::new(PipelineConfig::default())?;
//! let sticker = pipeline.process_file("frog.png")?;
//! sticker.save("frog_sticker.webp")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Bot layer
//!
//! [`bot::StickerBot`] adds the chat front end: command parsing, a FIFO
//! request queue with one pending request per user, per-channel word filters
//! and delivery of each generated image through the pipeline. The chat
//! platform and the image generation service are reached only through the
//! [`bot::ChatTransport`] and [`bot::GenerationService`] traits.
//!
//! ## Feature Flags
//!
//! - `cli` (default): the `stickerbot` binary and tracing subscriber setup
//! - `webp-support` (default): decode WebP inputs
//! - `tracing-json`, `tracing-files`: extra log sinks for the binary

pub mod bot;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compositor;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod removal;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

pub use compositor::{
    EncodedSticker, PngStickerEncoder, StickerCompositor, StickerEncoder, WebPStickerEncoder,
};
pub use config::{BotConfig, CompositionLimits, PipelineConfig, PipelineConfigBuilder};
pub use error::{Result, StickerError};
pub use pipeline::{ImageOutcome, StickerPipeline};
pub use removal::{BackgroundRemover, HueBand, KeyColorSource, RemovalStats, RemovalStrategy};
pub use services::{
    ConsoleProgressReporter, ImageFetcher, ImageIOService, NoOpProgressReporter, ProcessingStage,
    ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use types::{Color, Corner, ProcessingTimings, RasterImage, StickerAsset, StickerFormat};
pub use utils::{ColorParser, Hsl, NumericValidator, PathValidator};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, spans, TracingConfig, TracingFormat, TracingOutput};

/// Make one sticker from encoded image bytes
///
/// Convenience wrapper that builds a throwaway [`StickerPipeline`]; reuse a
/// pipeline when processing more than one image.
///
/// # Examples
///
/// ```rust,no_run
/// use stickerbot::{make_sticker, PipelineConfig};
///
/// # fn example() -> stickerbot::Result<()> {
/// let bytes = std::fs::read("generated.png")?;
/// let sticker = make_sticker(&bytes, &PipelineConfig::default())?;
/// assert!(sticker.len() <= 512 * 1024);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// As [`StickerPipeline::process_bytes`], plus `InvalidConfig`.
pub fn make_sticker(bytes: &[u8], config: &PipelineConfig) -> Result<StickerAsset> {
    StickerPipeline::new(config.clone())?.process_bytes(bytes)
}

/// Async variant of [`make_sticker`] reading from any `AsyncRead`
///
/// # Errors
/// As [`StickerPipeline::process_reader`], plus `InvalidConfig`.
pub async fn make_sticker_from_reader<R: tokio::io::AsyncRead + Unpin>(
    reader: R,
    config: &PipelineConfig,
) -> Result<StickerAsset> {
    StickerPipeline::new(config.clone())?
        .process_reader(reader)
        .await
}
