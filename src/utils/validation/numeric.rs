//! Numeric validation utilities
//!
//! Range checks for user-supplied parameters and checked conversions for
//! scaled image dimensions.

use crate::error::{Result, StickerError};

/// Validator for numeric parameters and conversions
pub struct NumericValidator;

impl NumericValidator {
    /// Convert a scaled dimension to `u32`, rounding to nearest and flooring at 1
    ///
    /// # Errors
    /// Non-finite, negative or overflowing values.
    pub fn scaled_dimension(value: f64) -> Result<u32> {
        if !value.is_finite() || value < 0.0 {
            return Err(StickerError::processing_stage_error(
                "resize",
                &format!("scaled dimension {value} is not a finite non-negative number"),
                None,
            ));
        }
        let rounded = value.round();
        if rounded > f64::from(u32::MAX) {
            return Err(StickerError::processing_stage_error(
                "resize",
                &format!("scaled dimension {value} exceeds u32::MAX"),
                None,
            ));
        }
        Ok((rounded as u32).max(1))
    }

    /// Validate quality setting (0-100)
    ///
    /// # Errors
    /// `InvalidConfig` above 100.
    pub fn validate_quality(value: u8) -> Result<u8> {
        if value > 100 {
            return Err(StickerError::invalid_config(format!(
                "Quality must be between 0 and 100, got {value}"
            )));
        }
        Ok(value)
    }

    /// Validate an RGB distance tolerance
    ///
    /// # Errors
    /// `InvalidConfig` for negative or non-finite values.
    pub fn validate_tolerance(value: f32) -> Result<f32> {
        if !value.is_finite() || value < 0.0 {
            return Err(StickerError::invalid_config(format!(
                "Tolerance must be a finite value >= 0, got {value}"
            )));
        }
        Ok(value)
    }

    /// Validate numeric range (inclusive)
    ///
    /// # Errors
    /// `InvalidConfig` outside `[min, max]`.
    pub fn validate_range<T>(value: T, min: T, max: T, name: &str) -> Result<T>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(StickerError::invalid_config(format!(
                "{name} must be between {min} and {max}, got {value}"
            )));
        }
        Ok(value)
    }

    /// Validate that a value is positive
    ///
    /// # Errors
    /// `InvalidConfig` for zero or negative values.
    pub fn validate_positive<T>(value: T, name: &str) -> Result<T>
    where
        T: PartialOrd + std::fmt::Display + Copy + Default,
    {
        if value <= T::default() {
            return Err(StickerError::invalid_config(format!(
                "{name} must be positive, got {value}"
            )));
        }
        Ok(value)
    }
}
