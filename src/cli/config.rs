//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliCorner, CliOutputFormat, CliStrategy};
use crate::{
    config::{CompositionLimits, PipelineConfig, PipelineConfigBuilder},
    removal::{HueBand, KeyColorSource, RemovalStrategy, DEFAULT_BLOCK_SIZE, DEFAULT_TOLERANCE},
    types::{Corner, StickerFormat},
    utils::{ColorParser, NumericValidator},
};
use anyhow::{Context, Result};
use std::time::Duration;

/// Convert CLI arguments to a `PipelineConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Start from `--config` (or defaults) and apply every flag that was given
    pub(crate) fn from_cli(cli: &Cli) -> Result<PipelineConfig> {
        let base = match &cli.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        let mut builder = PipelineConfigBuilder::from_config(base);

        if let Some(strategy) = cli.strategy {
            builder = builder.strategy(Self::strategy(strategy));
        }
        if let Some(key) = Self::key_source(cli)? {
            builder = builder.key(key);
        }
        if let Some(tolerance) = cli.tolerance {
            builder = builder.tolerance(tolerance);
        }
        if let Some(erode) = cli.erode {
            builder = builder.erode(erode);
        }

        if cli.compact {
            builder = builder.max_bytes(CompositionLimits::compact().max_bytes);
        }
        if let Some(max_bytes) = cli.max_bytes {
            builder = builder.max_bytes(max_bytes);
        }
        if let Some(max_dimension) = cli.max_dimension {
            builder = builder.max_dimension(max_dimension);
        }
        if let Some(step) = cli.quality_step {
            builder = builder.quality_step(step);
        }
        if let Some(floor) = cli.quality_floor {
            builder = builder.quality_floor(floor);
        }
        if let Some(format) = cli.format {
            builder = builder.format(match format {
                CliOutputFormat::Webp => StickerFormat::WebP,
                CliOutputFormat::Png => StickerFormat::Png,
            });
        }
        if let Some(seconds) = cli.timeout {
            builder = builder.per_image_timeout(Duration::from_secs(seconds));
        }

        builder.build().context("Invalid configuration")
    }

    fn strategy(strategy: CliStrategy) -> RemovalStrategy {
        match strategy {
            CliStrategy::FloodFill => RemovalStrategy::default(),
            CliStrategy::Global => RemovalStrategy::GlobalMatch {
                key: KeyColorSource::default(),
                tolerance: DEFAULT_TOLERANCE,
            },
            CliStrategy::GreenScreen => RemovalStrategy::HueBand {
                band: HueBand::green_screen(),
            },
            CliStrategy::GreenScreenNarrow => RemovalStrategy::HueBand {
                band: HueBand::green_screen_narrow(),
            },
            CliStrategy::Purple => RemovalStrategy::HueBand {
                band: HueBand::purple(),
            },
        }
    }

    /// Key color source from the key flags; `None` when none were given
    fn key_source(cli: &Cli) -> Result<Option<KeyColorSource>> {
        if cli.top_left_pixel {
            return Ok(Some(KeyColorSource::TopLeftPixel));
        }
        if let Some(hex) = &cli.key_color {
            let color = ColorParser::parse_hex(hex).context("Invalid --key-color")?;
            return Ok(Some(KeyColorSource::Fixed { color }));
        }
        if cli.key_corner.is_none() && cli.block_size.is_none() {
            return Ok(None);
        }
        let corner = match cli.key_corner.unwrap_or(CliCorner::TopLeft) {
            CliCorner::TopLeft => Corner::TopLeft,
            CliCorner::TopRight => Corner::TopRight,
            CliCorner::BottomLeft => Corner::BottomLeft,
            CliCorner::BottomRight => Corner::BottomRight,
        };
        Ok(Some(KeyColorSource::CornerBlock {
            corner,
            size: cli.block_size.unwrap_or(DEFAULT_BLOCK_SIZE),
        }))
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if let Some(tolerance) = cli.tolerance {
            NumericValidator::validate_tolerance(tolerance).context("Invalid --tolerance")?;
        }
        if let Some(floor) = cli.quality_floor {
            NumericValidator::validate_quality(floor).context("Invalid --quality-floor")?;
        }
        if let Some(size) = cli.block_size {
            NumericValidator::validate_positive(size, "block size")?;
        }

        let hue_band = matches!(
            cli.strategy,
            Some(CliStrategy::GreenScreen | CliStrategy::GreenScreenNarrow | CliStrategy::Purple)
        );
        if hue_band
            && (cli.tolerance.is_some()
                || cli.key_color.is_some()
                || cli.key_corner.is_some()
                || cli.top_left_pixel)
        {
            anyhow::bail!("Key color and tolerance flags do not apply to hue band strategies");
        }
        if cli.erode.is_some() && cli.strategy.is_some_and(|s| s != CliStrategy::FloodFill) {
            anyhow::bail!("--erode only applies to the flood-fill strategy");
        }
        Ok(())
    }
}
