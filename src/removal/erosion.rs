use crate::types::RasterImage;

/// One pass of 8-neighbour alpha erosion
///
/// Every non-transparent pixel with at least one fully transparent neighbour
/// (of 8) becomes transparent. Neighbourhoods are read from the mask as it was
/// before the pass, so one call strips exactly one pixel of halo. Pixels
/// outside the image do not count as transparent.
///
/// Returns the number of pixels eroded.
pub fn erode_alpha(image: &mut RasterImage) -> usize {
    let (width, height) = image.dimensions();
    let w = width as usize;
    let transparent: Vec<bool> = image.as_rgba().pixels().map(|p| p.0[3] == 0).collect();

    let is_clear = |x: i64, y: i64| -> bool {
        if x < 0 || y < 0 || x >= i64::from(width) || y >= i64::from(height) {
            return false;
        }
        transparent
            .get(y as usize * w + x as usize)
            .copied()
            .unwrap_or(false)
    };

    let mut to_clear = Vec::new();
    for y in 0..i64::from(height) {
        for x in 0..i64::from(width) {
            if is_clear(x, y) {
                continue;
            }
            let touches_background = (-1..=1)
                .flat_map(|dy| (-1..=1).map(move |dx| (dx, dy)))
                .filter(|&(dx, dy)| dx != 0 || dy != 0)
                .any(|(dx, dy)| is_clear(x + dx, y + dy));
            if touches_background {
                to_clear.push((x as u32, y as u32));
            }
        }
    }

    for &(x, y) in &to_clear {
        image.set_alpha(x, y, 0);
    }
    to_clear.len()
}
