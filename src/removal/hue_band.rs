use crate::{
    error::{Result, StickerError},
    types::{Color, RasterImage},
    utils::color::Hsl,
};
use serde::{Deserialize, Serialize};

/// A fixed region of HSL space treated as backdrop
///
/// When `hue_min > hue_max` the band wraps through 0°.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HueBand {
    pub hue_min: f32,
    pub hue_max: f32,
    pub saturation_min: f32,
    pub saturation_max: f32,
    pub lightness_min: f32,
    pub lightness_max: f32,
}

impl HueBand {
    /// Wide green-screen band (70°–160°)
    #[must_use]
    pub fn green_screen() -> Self {
        Self {
            hue_min: 70.0,
            hue_max: 160.0,
            saturation_min: 0.25,
            saturation_max: 1.0,
            lightness_min: 0.15,
            lightness_max: 0.9,
        }
    }

    /// Narrow green-screen band (85°–145°) that spares yellow-green subjects
    #[must_use]
    pub fn green_screen_narrow() -> Self {
        Self {
            hue_min: 85.0,
            hue_max: 145.0,
            saturation_min: 0.4,
            saturation_max: 1.0,
            lightness_min: 0.2,
            lightness_max: 0.8,
        }
    }

    /// Purple backdrop band (260°–300°)
    #[must_use]
    pub fn purple() -> Self {
        Self {
            hue_min: 260.0,
            hue_max: 300.0,
            saturation_min: 0.25,
            saturation_max: 1.0,
            lightness_min: 0.15,
            lightness_max: 0.85,
        }
    }

    #[must_use]
    pub fn contains(&self, hsl: Hsl) -> bool {
        let hue_ok = if self.hue_min <= self.hue_max {
            hsl.hue >= self.hue_min && hsl.hue <= self.hue_max
        } else {
            hsl.hue >= self.hue_min || hsl.hue <= self.hue_max
        };
        hue_ok
            && (self.saturation_min..=self.saturation_max).contains(&hsl.saturation)
            && (self.lightness_min..=self.lightness_max).contains(&hsl.lightness)
    }

    /// # Errors
    /// `InvalidConfig` for out-of-range bounds.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("hue_min", self.hue_min), ("hue_max", self.hue_max)] {
            if !(0.0..=360.0).contains(&value) {
                return Err(StickerError::config_value_error(name, value, "0-360", None));
            }
        }
        for (name, lo, hi) in [
            ("saturation", self.saturation_min, self.saturation_max),
            ("lightness", self.lightness_min, self.lightness_max),
        ] {
            if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo > hi {
                return Err(StickerError::invalid_config(format!(
                    "Invalid {name} range {lo}..{hi} (expected 0.0 <= min <= max <= 1.0)"
                )));
            }
        }
        Ok(())
    }
}

/// Clear alpha on every pixel whose HSL projection lies in `band`
///
/// Returns the number of pixels newly made transparent.
pub fn remove_hue_band(image: &mut RasterImage, band: &HueBand) -> usize {
    let mut removed = 0;
    image.map_pixels(|_, _, mut pixel| {
        if pixel.0[3] != 0 && band.contains(Color::from_rgba(pixel).to_hsl()) {
            pixel.0[3] = 0;
            removed += 1;
        }
        pixel
    });
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_green_screen_shades() {
        let band = HueBand::green_screen();
        // noisy generated greens
        for (r, g, b) in [(0, 255, 0), (40, 200, 60), (90, 220, 30), (20, 170, 90)] {
            assert!(band.contains(Color::new(r, g, b).to_hsl()), "({r},{g},{b})");
        }
        // subject colors
        for (r, g, b) in [(255, 0, 0), (250, 220, 180), (255, 255, 255), (20, 20, 20)] {
            assert!(!band.contains(Color::new(r, g, b).to_hsl()), "({r},{g},{b})");
        }
    }

    #[test]
    fn test_narrow_band_spares_yellow_green() {
        let chartreuse = Color::new(160, 230, 30).to_hsl();
        assert!(HueBand::green_screen().contains(chartreuse));
        assert!(!HueBand::green_screen_narrow().contains(chartreuse));
    }

    #[test]
    fn test_purple_band() {
        let band = HueBand::purple();
        assert!(band.contains(Color::new(128, 0, 255).to_hsl()));
        assert!(!band.contains(Color::new(0, 0, 255).to_hsl()));
    }

    #[test]
    fn test_wrapping_band() {
        let reds = HueBand {
            hue_min: 340.0,
            hue_max: 20.0,
            saturation_min: 0.2,
            saturation_max: 1.0,
            lightness_min: 0.1,
            lightness_max: 0.9,
        };
        assert!(reds.contains(Color::new(255, 0, 0).to_hsl()));
        assert!(reds.contains(Color::new(255, 0, 40).to_hsl()));
        assert!(!reds.contains(Color::new(0, 255, 0).to_hsl()));
        assert!(reds.validate().is_ok());
    }

    #[test]
    fn test_validate_ranges() {
        let mut band = HueBand::green_screen();
        band.lightness_min = 0.95;
        assert!(band.validate().is_err());
        let mut band = HueBand::purple();
        band.hue_max = 400.0;
        assert!(band.validate().is_err());
    }

    #[test]
    fn test_remove_hue_band_is_positional_agnostic() {
        let mut image = RasterImage::from_pixel(5, 5, Rgba([255, 0, 0, 255]));
        image.set_pixel(2, 2, Rgba([30, 210, 40, 255]));
        image.set_pixel(0, 4, Rgba([0, 255, 0, 255]));
        assert_eq!(remove_hue_band(&mut image, &HueBand::green_screen()), 2);
        assert_eq!(image.alpha(2, 2), Some(0));
    }
}
