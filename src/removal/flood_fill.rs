use crate::types::{Color, RasterImage};
use std::collections::VecDeque;

/// Clear alpha on every pixel connected to the border through key-colored pixels
///
/// Every border pixel seeds the queue. A dequeued pixel within `tolerance` of
/// `key` is made transparent and its unvisited 4-neighbours are queued.
/// Key-colored regions enclosed by foreground are never reached and stay
/// opaque. The resulting mask does not depend on queue order.
///
/// Returns the number of pixels made transparent.
pub fn flood_fill_from_border(image: &mut RasterImage, key: Color, tolerance: f32) -> usize {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return 0;
    }

    let w = width as usize;
    let mut visited = vec![false; w * height as usize];
    let mut queue = VecDeque::with_capacity(2 * (w + height as usize));

    let mut visit = |x: u32, y: u32, queue: &mut VecDeque<(u32, u32)>| {
        if let Some(seen) = visited.get_mut(y as usize * w + x as usize) {
            if !*seen {
                *seen = true;
                queue.push_back((x, y));
            }
        }
    };

    for x in 0..width {
        visit(x, 0, &mut queue);
        visit(x, height - 1, &mut queue);
    }
    for y in 1..height.saturating_sub(1) {
        visit(0, y, &mut queue);
        visit(width - 1, y, &mut queue);
    }

    let mut removed = 0;
    while let Some((x, y)) = queue.pop_front() {
        let Some(color) = image.color_at(x, y) else {
            continue;
        };
        if color.distance(key) > tolerance {
            continue;
        }

        image.set_alpha(x, y, 0);
        removed += 1;

        if x > 0 {
            visit(x - 1, y, &mut queue);
        }
        if x + 1 < width {
            visit(x + 1, y, &mut queue);
        }
        if y > 0 {
            visit(x, y - 1, &mut queue);
        }
        if y + 1 < height {
            visit(x, y + 1, &mut queue);
        }
    }

    removed
}
