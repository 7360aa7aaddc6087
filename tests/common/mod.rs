//! Synthetic image builders shared by the integration tests

#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use stickerbot::RasterImage;

pub const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
pub const RED: Rgba<u8> = Rgba([220, 30, 30, 255]);
pub const BLUE: Rgba<u8> = Rgba([30, 60, 220, 255]);

/// Green backdrop with a red rectangle `[x0, x1) x [y0, y1)`
pub fn subject_on_backdrop(width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
            RED
        } else {
            GREEN
        }
    })
}

/// Green backdrop, red ring, green hole in the middle of the ring
pub fn ring_with_hole(size: u32) -> RasterImage {
    let mut image = RasterImage::from_pixel(size, size, GREEN);
    let quarter = size / 4;
    image.map_region(quarter, quarter, size / 2, size / 2, |_, _, _| RED);
    image.map_region(size / 2 - 1, size / 2 - 1, 2, 2, |_, _, _| GREEN);
    image
}

/// Deterministic noise that compresses badly
pub fn noise(width: u32, height: u32) -> RgbaImage {
    let mut state: u32 = 0x9E37_79B9;
    RgbaImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state & 0xFF) as u8
        };
        Rgba([next(), next(), next(), 255])
    })
}

pub fn encode_png(image: &RgbaImage) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, image::ImageFormat::Png)
        .expect("PNG encoding of a test image");
    cursor.into_inner()
}

pub fn decode(bytes: &[u8]) -> RgbaImage {
    image::load_from_memory(bytes)
        .expect("decodable sticker")
        .to_rgba8()
}
