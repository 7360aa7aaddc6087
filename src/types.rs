//! Core value types shared across the pipeline

use crate::{
    error::{Result, StickerError},
    utils::color::{rgb_to_hsl, Hsl},
};
use image::{DynamicImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An 8-bit RGB color used as a sample, key color or region average
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Drop the alpha channel of a pixel
    #[must_use]
    pub fn from_rgba(pixel: Rgba<u8>) -> Self {
        let [r, g, b, _] = pixel.0;
        Self { r, g, b }
    }

    /// Pair with an alpha value
    #[must_use]
    pub fn with_alpha(self, alpha: u8) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, alpha])
    }

    /// Euclidean distance in RGB space, in `[0, ~441.7]`
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        let dr = f32::from(self.r) - f32::from(other.r);
        let dg = f32::from(self.g) - f32::from(other.g);
        let db = f32::from(self.b) - f32::from(other.b);
        (dr * dr + dg * dg + db * db).sqrt()
    }

    /// Channel-wise rounded mean; `None` for an empty sample
    pub fn average<I: IntoIterator<Item = Self>>(colors: I) -> Option<Self> {
        let (mut r, mut g, mut b, mut n) = (0u64, 0u64, 0u64, 0u64);
        for color in colors {
            r += u64::from(color.r);
            g += u64::from(color.g);
            b += u64::from(color.b);
            n += 1;
        }
        if n == 0 {
            return None;
        }
        let mean = |sum: u64| ((sum + n / 2) / n) as u8;
        Some(Self::new(mean(r), mean(g), mean(b)))
    }

    #[must_use]
    pub fn to_hsl(self) -> Hsl {
        rgb_to_hsl(self.r, self.g, self.b)
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Image corner used to anchor a key-color sample block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl std::fmt::Display for Corner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TopLeft => write!(f, "top-left"),
            Self::TopRight => write!(f, "top-right"),
            Self::BottomLeft => write!(f, "bottom-left"),
            Self::BottomRight => write!(f, "bottom-right"),
        }
    }
}

/// A mutable RGBA8 pixel grid
///
/// Dimensions are fixed at construction; only pixel content (alpha included)
/// changes. Each pipeline stage takes the image by value and hands it on.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    buffer: RgbaImage,
}

impl RasterImage {
    /// Create a fully transparent image
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: RgbaImage::new(width, height),
        }
    }

    /// Create an image filled with a single pixel value
    #[must_use]
    pub fn from_pixel(width: u32, height: u32, pixel: Rgba<u8>) -> Self {
        Self {
            buffer: RgbaImage::from_pixel(width, height, pixel),
        }
    }

    #[must_use]
    pub fn from_rgba(buffer: RgbaImage) -> Self {
        Self { buffer }
    }

    /// Decode any supported raster format from memory
    ///
    /// # Errors
    /// `StickerError::Decode` when the bytes are not a recognisable image.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(StickerError::decode("input is empty"));
        }
        let image = image::load_from_memory(bytes).map_err(|e| {
            StickerError::decode(format!("failed to decode {} input bytes: {}", bytes.len(), e))
        })?;
        Ok(Self::from(image))
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    #[must_use]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.buffer.get_pixel_checked(x, y).copied()
    }

    #[must_use]
    pub fn color_at(&self, x: u32, y: u32) -> Option<Color> {
        self.get_pixel(x, y).map(Color::from_rgba)
    }

    #[must_use]
    pub fn alpha(&self, x: u32, y: u32) -> Option<u8> {
        self.get_pixel(x, y).map(|p| p.0[3])
    }

    /// Whether the pixel at `(x, y)` is fully transparent; out of bounds is `false`
    #[must_use]
    pub fn is_transparent(&self, x: u32, y: u32) -> bool {
        self.alpha(x, y) == Some(0)
    }

    /// Overwrite a pixel; returns `false` when out of bounds
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: Rgba<u8>) -> bool {
        match self.buffer.get_pixel_mut_checked(x, y) {
            Some(slot) => {
                *slot = pixel;
                true
            },
            None => false,
        }
    }

    /// Overwrite only the alpha channel; returns `false` when out of bounds
    pub fn set_alpha(&mut self, x: u32, y: u32, alpha: u8) -> bool {
        match self.buffer.get_pixel_mut_checked(x, y) {
            Some(slot) => {
                slot.0[3] = alpha;
                true
            },
            None => false,
        }
    }

    /// Apply `f` to every pixel of a rectangle, clipped to the image bounds
    pub fn map_region<F>(&mut self, x: u32, y: u32, width: u32, height: u32, mut f: F)
    where
        F: FnMut(u32, u32, Rgba<u8>) -> Rgba<u8>,
    {
        let x_end = x.saturating_add(width).min(self.width());
        let y_end = y.saturating_add(height).min(self.height());
        for py in y..y_end {
            for px in x..x_end {
                if let Some(slot) = self.buffer.get_pixel_mut_checked(px, py) {
                    *slot = f(px, py, *slot);
                }
            }
        }
    }

    /// Apply `f` to every pixel
    pub fn map_pixels<F>(&mut self, f: F)
    where
        F: FnMut(u32, u32, Rgba<u8>) -> Rgba<u8>,
    {
        let (width, height) = self.dimensions();
        self.map_region(0, 0, width, height, f);
    }

    #[must_use]
    pub fn count_transparent(&self) -> usize {
        self.buffer.pixels().filter(|p| p.0[3] == 0).count()
    }

    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    #[must_use]
    pub fn as_rgba(&self) -> &RgbaImage {
        &self.buffer
    }

    #[must_use]
    pub fn into_rgba(self) -> RgbaImage {
        self.buffer
    }

    #[must_use]
    pub fn into_dynamic(self) -> DynamicImage {
        DynamicImage::ImageRgba8(self.buffer)
    }
}

impl From<DynamicImage> for RasterImage {
    fn from(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageRgba8(buffer) => Self { buffer },
            other => Self {
                buffer: other.to_rgba8(),
            },
        }
    }
}

impl From<RgbaImage> for RasterImage {
    fn from(buffer: RgbaImage) -> Self {
        Self { buffer }
    }
}

/// Wall-clock timings for one image, in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    pub decode_ms: u64,
    pub removal_ms: u64,
    pub resize_ms: u64,
    pub encode_ms: u64,
    pub total_ms: u64,
}

/// Encoded container for a finished sticker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StickerFormat {
    #[default]
    WebP,
    Png,
}

impl StickerFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::WebP => "webp",
            Self::Png => "png",
        }
    }

    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::WebP => "image/webp",
            Self::Png => "image/png",
        }
    }
}

/// The only value that leaves a successful pipeline run
#[derive(Debug, Clone)]
pub struct StickerAsset {
    /// Encoded bytes, guaranteed within the configured byte limit
    pub bytes: Vec<u8>,
    pub format: StickerFormat,
    pub dimensions: (u32, u32),
    pub original_dimensions: (u32, u32),
    /// Quality the accepted candidate was encoded at
    pub quality: u8,
    /// Number of encodes performed, including the accepted one
    pub attempts: u32,
    pub transparent_pixels: usize,
    pub timings: ProcessingTimings,
}

impl StickerAsset {
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Write the encoded bytes to `path`, creating parent directories
    ///
    /// # Errors
    /// `Io` when the file or its parent directories cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::services::ImageIOService::write_bytes(path, &self.bytes)
    }
}
