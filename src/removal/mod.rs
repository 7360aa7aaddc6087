//! Color-keyed background removal
//!
//! Three strategies share one entry point, [`RemovalStrategy::apply`]:
//!
//! - **Corner flood fill**: removes key-colored pixels reachable from the image
//!   border through key-colored pixels, optionally followed by one erosion pass.
//! - **Global match**: removes every key-colored pixel regardless of position.
//! - **Hue band**: removes pixels whose HSL projection falls in a fixed band,
//!   for backdrops whose exact shade drifts between generations.
//!
//! The remover only touches the alpha channel. No I/O happens here.

mod erosion;
mod flood_fill;
mod global;
mod hue_band;

pub use erosion::erode_alpha;
pub use flood_fill::flood_fill_from_border;
pub use global::remove_matching;
pub use hue_band::{remove_hue_band, HueBand};

use crate::{
    error::{Result, StickerError},
    types::{Color, Corner, RasterImage},
};
use instant::Instant;
use serde::{Deserialize, Serialize};
use tracing::{debug, span, Level};

/// Default side length of the averaged corner sample
pub const DEFAULT_BLOCK_SIZE: u32 = 5;

/// Default RGB distance tolerance for key-color strategies
pub const DEFAULT_TOLERANCE: f32 = 30.0;

/// Where the key (background) color comes from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "kebab-case")]
pub enum KeyColorSource {
    /// The single pixel at (0, 0)
    TopLeftPixel,
    /// Mean of a `size`×`size` block anchored at `corner`, clipped to the image
    CornerBlock { corner: Corner, size: u32 },
    /// A known backdrop color
    Fixed { color: Color },
}

impl Default for KeyColorSource {
    fn default() -> Self {
        Self::CornerBlock {
            corner: Corner::TopLeft,
            size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl KeyColorSource {
    /// Sample the key color; `None` only for an empty image
    #[must_use]
    pub fn sample(&self, image: &RasterImage) -> Option<Color> {
        if image.is_empty() {
            return None;
        }
        match *self {
            Self::TopLeftPixel => image.color_at(0, 0),
            Self::CornerBlock { corner, size } => {
                let block_w = size.clamp(1, image.width());
                let block_h = size.clamp(1, image.height());
                let x0 = match corner {
                    Corner::TopLeft | Corner::BottomLeft => 0,
                    Corner::TopRight | Corner::BottomRight => image.width() - block_w,
                };
                let y0 = match corner {
                    Corner::TopLeft | Corner::TopRight => 0,
                    Corner::BottomLeft | Corner::BottomRight => image.height() - block_h,
                };
                Color::average(
                    (y0..y0 + block_h)
                        .flat_map(|y| (x0..x0 + block_w).map(move |x| (x, y)))
                        .filter_map(|(x, y)| image.color_at(x, y)),
                )
            },
            Self::Fixed { color } => Some(color),
        }
    }
}

/// Background classification strategy, chosen once at configuration time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RemovalStrategy {
    /// Border-seeded 4-connected flood fill over key-colored pixels
    CornerFloodFill {
        key: KeyColorSource,
        tolerance: f32,
        /// Run one 8-neighbour alpha erosion pass after the fill
        erode: bool,
    },
    /// Per-pixel key-color match with no connectivity constraint
    GlobalMatch { key: KeyColorSource, tolerance: f32 },
    /// Per-pixel HSL band classification
    HueBand { band: HueBand },
}

impl Default for RemovalStrategy {
    fn default() -> Self {
        Self::CornerFloodFill {
            key: KeyColorSource::default(),
            tolerance: DEFAULT_TOLERANCE,
            erode: false,
        }
    }
}

/// Summary of one removal pass, for logging and assets
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalStats {
    pub strategy: &'static str,
    pub key_color: Option<Color>,
    /// Pixels made transparent by the classification itself
    pub removed: usize,
    /// Pixels made transparent by the erosion pass
    pub eroded: usize,
    pub transparent_after: usize,
}

impl RemovalStrategy {
    /// Short stable name used in logs and CLI output
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CornerFloodFill { .. } => "corner-flood-fill",
            Self::GlobalMatch { .. } => "global-match",
            Self::HueBand { .. } => "hue-band",
        }
    }

    /// Check parameter ranges
    ///
    /// # Errors
    /// - Negative or non-finite tolerance
    /// - Zero-sized corner block
    /// - Hue band outside its ranges
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::CornerFloodFill { key, tolerance, .. } | Self::GlobalMatch { key, tolerance } => {
                if !tolerance.is_finite() || *tolerance < 0.0 {
                    return Err(StickerError::config_value_error(
                        "tolerance",
                        *tolerance,
                        "finite, >= 0",
                        Some(DEFAULT_TOLERANCE),
                    ));
                }
                if let KeyColorSource::CornerBlock { size: 0, .. } = key {
                    return Err(StickerError::config_value_error(
                        "corner block size",
                        0,
                        ">= 1",
                        Some(DEFAULT_BLOCK_SIZE),
                    ));
                }
                Ok(())
            },
            Self::HueBand { band } => band.validate(),
        }
    }

    /// Classify background pixels in place by zeroing their alpha
    pub fn apply(&self, image: &mut RasterImage) -> RemovalStats {
        let (key_color, removed, eroded) = match self {
            Self::CornerFloodFill {
                key,
                tolerance,
                erode,
            } => match key.sample(image) {
                Some(key_color) => {
                    let removed = flood_fill_from_border(image, key_color, *tolerance);
                    let eroded = if *erode { erode_alpha(image) } else { 0 };
                    (Some(key_color), removed, eroded)
                },
                None => (None, 0, 0),
            },
            Self::GlobalMatch { key, tolerance } => match key.sample(image) {
                Some(key_color) => (
                    Some(key_color),
                    remove_matching(image, key_color, *tolerance),
                    0,
                ),
                None => (None, 0, 0),
            },
            Self::HueBand { band } => (None, remove_hue_band(image, band), 0),
        };

        RemovalStats {
            strategy: self.name(),
            key_color,
            removed,
            eroded,
            transparent_after: image.count_transparent(),
        }
    }
}

/// Stage wrapper that owns the strategy and times each pass
#[derive(Debug, Clone, Default)]
pub struct BackgroundRemover {
    strategy: RemovalStrategy,
}

impl BackgroundRemover {
    #[must_use]
    pub fn new(strategy: RemovalStrategy) -> Self {
        Self { strategy }
    }

    #[must_use]
    pub fn strategy(&self) -> &RemovalStrategy {
        &self.strategy
    }

    /// Take ownership of an image and return it with background alpha cleared
    pub fn remove(&self, mut image: RasterImage) -> (RasterImage, RemovalStats) {
        let _span = span!(
            Level::DEBUG,
            "background_removal",
            strategy = self.strategy.name(),
            width = image.width(),
            height = image.height()
        )
        .entered();

        let start = Instant::now();
        let stats = self.strategy.apply(&mut image);

        debug!(
            key_color = ?stats.key_color,
            removed = stats.removed,
            eroded = stats.eroded,
            transparent = stats.transparent_after,
            total = image.pixel_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Background removed"
        );

        (image, stats)
    }
}
