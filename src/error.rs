//! Error types for sticker pipeline operations

use thiserror::Error;

/// Result type alias for sticker pipeline operations
pub type Result<T> = std::result::Result<T, StickerError>;

/// Error types for decoding, background removal, compositing and delivery
#[derive(Error, Debug)]
pub enum StickerError {
    /// Input bytes are not a valid raster image
    #[error("Decode error: {0}")]
    Decode(String),

    /// The quality floor was reached without meeting the byte budget
    #[error(
        "Compression limit exceeded: smallest candidate was {smallest} bytes at quality {quality}, limit is {limit} bytes"
    )]
    CompressionLimit {
        /// Configured maximum encoded size in bytes
        limit: usize,
        /// Size of the last (smallest-quality) candidate
        smallest: usize,
        /// Quality used for the last candidate
        quality: u8,
    },

    /// Per-image deadline imposed by a caller's timer
    #[error("Timed out after {seconds}s")]
    Timeout {
        /// Deadline that expired, in seconds
        seconds: u64,
    },

    /// Encoder failure unrelated to the size budget
    #[error("Encode error: {0}")]
    Encode(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image codec errors surfaced by the image crate
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON (de)serialization errors for config and channel stores
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP fetch errors
    #[error("Network error: {0}")]
    Network(String),

    /// Chat transport failures
    #[error("Transport error: {0}")]
    Transport(String),

    /// Generation service failures
    #[error("Generation error: {0}")]
    Generation(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StickerError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a new generation service error
    pub fn generation<S: Into<String>>(msg: S) -> Self {
        Self::Generation(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a timeout error from a deadline
    #[must_use]
    pub fn timeout(deadline: std::time::Duration) -> Self {
        Self::Timeout {
            seconds: deadline.as_secs(),
        }
    }

    /// Create a network error with request context
    pub fn network_error<E: std::fmt::Display>(context: &str, error: E) -> Self {
        Self::Network(format!("{context}: {error}"))
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create processing error with stage context
    pub fn processing_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {})", info),
            None => String::new(),
        };

        Self::Internal(format!(
            "Processing failed at stage '{}'{}: {}",
            stage, input_context, details
        ))
    }

    /// Whether the failure is confined to a single image and the batch may continue
    #[must_use]
    pub fn is_per_image(&self) -> bool {
        matches!(
            self,
            Self::Decode(_)
                | Self::CompressionLimit { .. }
                | Self::Timeout { .. }
                | Self::Encode(_)
                | Self::Image(_)
                | Self::Network(_)
        )
    }
}
