use crate::{
    error::{Result, StickerError},
    types::RasterImage,
    utils::NumericValidator,
};
use image::{imageops::FilterType, ImageBuffer, Rgba, Rgba32FImage, RgbaImage};

/// Target size for `(width, height)` under a longest-side bound
///
/// Aspect ratio is preserved with round-to-nearest on the short side, which
/// never drops below 1. Images already within bounds keep their size.
///
/// # Errors
/// `InvalidConfig` for a zero bound, `Processing` for an empty image.
pub fn fit_dimensions(width: u32, height: u32, max_dimension: u32) -> Result<(u32, u32)> {
    NumericValidator::validate_positive(max_dimension, "max_dimension")?;
    if width == 0 || height == 0 {
        return Err(StickerError::processing_stage_error(
            "resize",
            &format!("cannot resize an empty {width}x{height} image"),
            None,
        ));
    }
    let longest = width.max(height);
    if longest <= max_dimension {
        return Ok((width, height));
    }
    let scale = f64::from(max_dimension) / f64::from(longest);
    if width >= height {
        Ok((max_dimension, NumericValidator::scaled_dimension(f64::from(height) * scale)?))
    } else {
        Ok((NumericValidator::scaled_dimension(f64::from(width) * scale)?, max_dimension))
    }
}

/// Scale `image` down so its longest side is at most `max_dimension`
///
/// Filtering runs on premultiplied alpha so transparent background colour
/// does not bleed into subject edges.
///
/// # Errors
/// As [`fit_dimensions`].
pub fn resize_to_fit(image: RasterImage, max_dimension: u32) -> Result<RasterImage> {
    let (width, height) = image.dimensions();
    let (target_w, target_h) = fit_dimensions(width, height, max_dimension)?;
    if (target_w, target_h) == (width, height) {
        return Ok(image);
    }

    let source = image.as_rgba();
    let premultiplied: Rgba32FImage = ImageBuffer::from_fn(width, height, |x, y| {
        let [r, g, b, a] = source.get_pixel(x, y).0;
        let alpha = f32::from(a) / 255.0;
        Rgba([
            f32::from(r) / 255.0 * alpha,
            f32::from(g) / 255.0 * alpha,
            f32::from(b) / 255.0 * alpha,
            alpha,
        ])
    });

    let resized = image::imageops::resize(&premultiplied, target_w, target_h, FilterType::Lanczos3);

    let output = RgbaImage::from_fn(target_w, target_h, |x, y| {
        let [r, g, b, a] = resized.get_pixel(x, y).0;
        let alpha = a.clamp(0.0, 1.0);
        let alpha_u8 = (alpha * 255.0).round() as u8;
        if alpha_u8 == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        let channel = |c: f32| ((c / alpha).clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba([channel(r), channel(g), channel(b), alpha_u8])
    });

    Ok(RasterImage::from_rgba(output))
}
