use crate::types::{Color, RasterImage};

/// Clear alpha on every pixel within `tolerance` of `key`, wherever it is
///
/// Returns the number of pixels newly made transparent.
pub fn remove_matching(image: &mut RasterImage, key: Color, tolerance: f32) -> usize {
    let mut removed = 0;
    image.map_pixels(|_, _, mut pixel| {
        if pixel.0[3] != 0 && Color::from_rgba(pixel).distance(key) <= tolerance {
            pixel.0[3] = 0;
            removed += 1;
        }
        pixel
    });
    removed
}
