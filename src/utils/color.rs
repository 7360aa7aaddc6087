//! Color parsing and color-space conversion utilities
//!
//! Hex parsing for CLI/config key colors and the RGB → HSL projection used by
//! hue-band background classification.

use crate::{
    error::{Result, StickerError},
    types::Color,
};
use serde::{Deserialize, Serialize};

/// Hue/saturation/lightness triple
///
/// `hue` is in degrees `[0, 360)`, `saturation` and `lightness` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
}

/// Convert 8-bit RGB to HSL
///
/// Achromatic colors (max == min) report hue 0 and saturation 0.
#[must_use]
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> Hsl {
    let r = f32::from(r) / 255.0;
    let g = f32::from(g) / 255.0;
    let b = f32::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let lightness = (max + min) / 2.0;

    let delta = max - min;
    if delta <= f32::EPSILON {
        return Hsl {
            hue: 0.0,
            saturation: 0.0,
            lightness,
        };
    }

    let saturation = if lightness > 0.5 {
        delta / (2.0 - max - min)
    } else {
        delta / (max + min)
    };

    #[allow(clippy::float_cmp)]
    let sector = if max == r {
        (g - b) / delta + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };

    Hsl {
        hue: (sector * 60.0) % 360.0,
        saturation,
        lightness,
    }
}

/// Utility for parsing and formatting colors
pub struct ColorParser;

impl ColorParser {
    /// Parse a hex color string
    ///
    /// Supports both #RRGGBB and #RGB formats, with or without the `#`.
    ///
    /// # Errors
    /// `InvalidConfig` for anything but 3 or 6 hex digits.
    pub fn parse_hex(hex: &str) -> Result<Color> {
        let hex = hex.trim().trim_start_matches('#');

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StickerError::invalid_config(format!(
                "Color '{hex}' contains non-hex characters"
            )));
        }

        let channel = |range: std::ops::Range<usize>, name: &str| -> Result<u8> {
            hex.get(range)
                .and_then(|digits| u8::from_str_radix(digits, 16).ok())
                .ok_or_else(|| {
                    StickerError::invalid_config(format!("Invalid {name} component in hex color"))
                })
        };

        match hex.len() {
            6 => Ok(Color::new(
                channel(0..2, "red")?,
                channel(2..4, "green")?,
                channel(4..6, "blue")?,
            )),
            // #RGB expands each digit (0xF -> 0xFF)
            3 => Ok(Color::new(
                channel(0..1, "red")? * 17,
                channel(1..2, "green")? * 17,
                channel(2..3, "blue")? * 17,
            )),
            _ => Err(StickerError::invalid_config(
                "Color must be in #RRGGBB or #RGB format",
            )),
        }
    }

    /// Format a color as `#rrggbb`
    #[must_use]
    pub fn to_hex(color: Color) -> String {
        format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
    }
}
