//! Configuration types for the sticker pipeline and the bot front end

use crate::{
    error::{Result, StickerError},
    removal::{KeyColorSource, RemovalStrategy},
    types::StickerFormat,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Telegram/Discord sticker side length
pub const DEFAULT_MAX_DIMENSION: u32 = 512;

/// Default encoded size budget (512 KiB)
pub const DEFAULT_MAX_BYTES: usize = 512 * 1024;

/// Size budget of the compact deployment (300 KiB)
pub const COMPACT_MAX_BYTES: usize = 300 * 1024;

/// Dimension and byte-size constraints applied by the compositor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionLimits {
    /// Longest allowed side; larger images are scaled down, never up
    pub max_dimension: u32,
    /// Largest accepted encoded size in bytes
    pub max_bytes: usize,
    /// Quality of the first encode attempt (0-100)
    pub max_quality: u8,
    /// Quality decrement between attempts
    pub quality_step: u8,
    /// Lowest quality tried before giving up
    pub quality_floor: u8,
}

impl Default for CompositionLimits {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            max_bytes: DEFAULT_MAX_BYTES,
            max_quality: 100,
            quality_step: 10,
            quality_floor: 10,
        }
    }
}

impl CompositionLimits {
    /// 512 px / 512 KiB limits
    #[must_use]
    pub fn standard() -> Self {
        Self::default()
    }

    /// 512 px / 300 KiB limits
    #[must_use]
    pub fn compact() -> Self {
        Self {
            max_bytes: COMPACT_MAX_BYTES,
            ..Self::default()
        }
    }

    /// Qualities the size-fit loop will try, in order
    #[must_use]
    pub fn quality_ladder(&self) -> Vec<u8> {
        let mut ladder = vec![self.max_quality];
        let mut quality = self.max_quality;
        while quality > self.quality_floor && self.quality_step > 0 {
            quality = quality.saturating_sub(self.quality_step).max(self.quality_floor);
            ladder.push(quality);
        }
        ladder
    }

    /// Validate all limits
    ///
    /// # Errors
    /// - Zero dimension or byte budget
    /// - Qualities above 100, zero step, or floor above the starting quality
    pub fn validate(&self) -> Result<()> {
        if self.max_dimension == 0 {
            return Err(StickerError::config_value_error(
                "max dimension",
                self.max_dimension,
                ">= 1",
                Some(DEFAULT_MAX_DIMENSION),
            ));
        }
        if self.max_bytes == 0 {
            return Err(StickerError::config_value_error(
                "max bytes",
                self.max_bytes,
                ">= 1",
                Some(DEFAULT_MAX_BYTES),
            ));
        }
        if self.max_quality > 100 {
            return Err(StickerError::config_value_error(
                "max quality",
                self.max_quality,
                "0-100",
                Some(100),
            ));
        }
        if self.quality_step == 0 || self.quality_step > 100 {
            return Err(StickerError::config_value_error(
                "quality step",
                self.quality_step,
                "1-100",
                Some(10),
            ));
        }
        if self.quality_floor > self.max_quality {
            return Err(StickerError::invalid_config(format!(
                "Quality floor {} is above max quality {}",
                self.quality_floor, self.max_quality
            )));
        }
        Ok(())
    }
}

/// Configuration for one pipeline instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Background classification strategy
    pub strategy: RemovalStrategy,
    /// Dimension and size budget
    pub limits: CompositionLimits,
    /// Output container
    pub format: StickerFormat,
    /// Encode WebP losslessly when quality is 100
    pub lossless_at_max: bool,
    /// Deadline for a single image in batch processing, in seconds
    pub per_image_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: RemovalStrategy::default(),
            limits: CompositionLimits::default(),
            format: StickerFormat::WebP,
            lossless_at_max: true,
            per_image_timeout_secs: 30,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use stickerbot::{PipelineConfig, CompositionLimits};
    ///
    /// let config = PipelineConfig::builder()
    ///     .tolerance(40.0)
    ///     .erode(true)
    ///     .limits(CompositionLimits::compact())
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.limits.max_bytes, 300 * 1024);
    /// ```
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    #[must_use]
    pub fn per_image_timeout(&self) -> Duration {
        Duration::from_secs(self.per_image_timeout_secs)
    }

    /// Validate strategy, limits and timeout
    ///
    /// # Errors
    /// `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.strategy.validate()?;
        self.limits.validate()?;
        if self.per_image_timeout_secs == 0 {
            return Err(StickerError::config_value_error(
                "per-image timeout (s)",
                self.per_image_timeout_secs,
                ">= 1",
                Some(30),
            ));
        }
        Ok(())
    }

    /// Load a JSON configuration file; missing fields take defaults
    ///
    /// # Errors
    /// `Io` when unreadable, `Serialization` on malformed JSON, `InvalidConfig` when values are out of range.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| StickerError::file_io_error("read config file", path, &e))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    ///
    /// # Errors
    /// `Serialization` or `Io`.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| StickerError::file_io_error("write config file", path, &e))
    }
}

/// Builder for `PipelineConfig`
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Start from an existing configuration (e.g. one loaded from disk)
    #[must_use]
    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn strategy(mut self, strategy: RemovalStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Set tolerance on key-color strategies; ignored for hue bands
    #[must_use]
    pub fn tolerance(mut self, value: f32) -> Self {
        match &mut self.config.strategy {
            RemovalStrategy::CornerFloodFill { tolerance, .. }
            | RemovalStrategy::GlobalMatch { tolerance, .. } => *tolerance = value,
            RemovalStrategy::HueBand { .. } => {},
        }
        self
    }

    /// Set the key color source on key-color strategies; ignored for hue bands
    #[must_use]
    pub fn key(mut self, source: KeyColorSource) -> Self {
        match &mut self.config.strategy {
            RemovalStrategy::CornerFloodFill { key, .. }
            | RemovalStrategy::GlobalMatch { key, .. } => *key = source,
            RemovalStrategy::HueBand { .. } => {},
        }
        self
    }

    /// Toggle the erosion pass; only meaningful for flood fill
    #[must_use]
    pub fn erode(mut self, enabled: bool) -> Self {
        if let RemovalStrategy::CornerFloodFill { erode, .. } = &mut self.config.strategy {
            *erode = enabled;
        }
        self
    }

    #[must_use]
    pub fn limits(mut self, limits: CompositionLimits) -> Self {
        self.config.limits = limits;
        self
    }

    #[must_use]
    pub fn max_dimension(mut self, max_dimension: u32) -> Self {
        self.config.limits.max_dimension = max_dimension;
        self
    }

    #[must_use]
    pub fn max_bytes(mut self, max_bytes: usize) -> Self {
        self.config.limits.max_bytes = max_bytes;
        self
    }

    #[must_use]
    pub fn quality_step(mut self, step: u8) -> Self {
        self.config.limits.quality_step = step;
        self
    }

    #[must_use]
    pub fn quality_floor(mut self, floor: u8) -> Self {
        self.config.limits.quality_floor = floor.min(100);
        self
    }

    #[must_use]
    pub fn format(mut self, format: StickerFormat) -> Self {
        self.config.format = format;
        self
    }

    #[must_use]
    pub fn lossless_at_max(mut self, enabled: bool) -> Self {
        self.config.lossless_at_max = enabled;
        self
    }

    #[must_use]
    pub fn per_image_timeout(mut self, timeout: Duration) -> Self {
        self.config.per_image_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// Any range violation reported by [`PipelineConfig::validate`].
    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Settings for the chat front end that drives the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Images requested per prompt
    pub default_batch_size: u32,
    /// Images requested per prompt inside forum threads
    pub thread_batch_size: u32,
    /// Upper bound for a `(N)` suffix in private chats
    pub max_batch_size: u32,
    /// Where per-channel whitelist/blacklist rules are persisted
    pub channel_config_path: PathBuf,
    /// Timeout for fetching one generated image, in seconds
    pub fetch_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            default_batch_size: 3,
            thread_batch_size: 1,
            max_batch_size: 16,
            channel_config_path: PathBuf::from("channel_config.json"),
            fetch_timeout_secs: 60,
        }
    }
}

impl BotConfig {
    /// # Errors
    /// `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("default batch size", self.default_batch_size),
            ("thread batch size", self.thread_batch_size),
            ("max batch size", self.max_batch_size),
        ] {
            if value == 0 {
                return Err(StickerError::config_value_error(name, value, ">= 1", None));
            }
        }
        if self.default_batch_size > self.max_batch_size {
            return Err(StickerError::invalid_config(format!(
                "Default batch size {} exceeds max batch size {}",
                self.default_batch_size, self.max_batch_size
            )));
        }
        Ok(())
    }
}
