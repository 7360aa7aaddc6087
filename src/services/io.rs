//! Image I/O operations service
//!
//! Keeps file, stdin and stdout handling out of the pipeline so the
//! processing stages stay pure.

use crate::{
    error::{Result, StickerError},
    types::{RasterImage, StickerFormat},
    utils::PathValidator,
};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Path argument that stands for stdin or stdout
pub const STDIO_PATH: &str = "-";

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load and decode an image from a file path
    ///
    /// # Examples
    /// ```rust,no_run
    /// use stickerbot::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("input.png")?;
    /// println!("{}x{}", image.width(), image.height());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    ///
    /// # Errors
    /// `Io` or `Decode`.
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RasterImage> {
        let path_ref = path.as_ref();
        let bytes = Self::read_bytes(path_ref)?;
        RasterImage::decode(&bytes).map_err(|e| {
            StickerError::decode(format!("{} ({})", e, path_ref.display()))
        })
    }

    /// Read raw bytes from a file, or from stdin when `path` is `-`
    ///
    /// # Errors
    /// `Io` for missing or unreadable files.
    pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        let path_ref = path.as_ref();
        if path_ref == Path::new(STDIO_PATH) {
            return Self::read_stdin();
        }
        PathValidator::validate_file_exists(path_ref)?;
        std::fs::read(path_ref).map_err(|e| StickerError::file_io_error("read image file", path_ref, &e))
    }

    /// Read all of stdin
    ///
    /// # Errors
    /// `Io` on read failure.
    pub fn read_stdin() -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        std::io::stdin()
            .lock()
            .read_to_end(&mut buffer)
            .map_err(|e| StickerError::file_io_error("read", STDIO_PATH, &e))?;
        log::debug!("Read {} bytes from stdin", buffer.len());
        Ok(buffer)
    }

    /// Write bytes to a file (creating parent directories), or to stdout when `path` is `-`
    ///
    /// # Errors
    /// `Io` on write failure.
    pub fn write_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
        let path_ref = path.as_ref();
        if path_ref == Path::new(STDIO_PATH) {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(bytes)
                .and_then(|()| stdout.flush())
                .map_err(|e| StickerError::file_io_error("write", STDIO_PATH, &e))?;
            return Ok(());
        }
        PathValidator::ensure_parent_dirs(path_ref)?;
        std::fs::write(path_ref, bytes)
            .map_err(|e| StickerError::file_io_error("write sticker file", path_ref, &e))
    }

    /// Default output path for an input file: `<dir>/<stem>_sticker.<ext>`
    #[must_use]
    pub fn sticker_output_path(input: &Path, format: StickerFormat) -> PathBuf {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sticker");
        input.with_file_name(format!("{}_sticker.{}", stem, format.extension()))
    }

    /// Short name of the container detected from magic bytes, for logging
    #[must_use]
    pub fn detect_format(bytes: &[u8]) -> Option<&'static str> {
        image::guess_format(bytes)
            .ok()
            .and_then(|format| format.extensions_str().first().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([0, 255, 0, 255]));
        let mut cursor = std::io::Cursor::new(Vec::new());
        image.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ImageIOService::load_image("/definitely/not/here.png");
        assert!(matches!(result, Err(StickerError::Io(_))));
    }

    #[test]
    fn test_write_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/dir/input.png");
        ImageIOService::write_bytes(&path, &png_bytes(6, 4)).unwrap();

        let image = ImageIOService::load_image(&path).unwrap();
        assert_eq!(image.dimensions(), (6, 4));
    }

    #[test]
    fn test_load_garbage_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();

        let err = ImageIOService::load_image(&path).unwrap_err();
        assert!(matches!(err, StickerError::Decode(_)));
        assert!(err.to_string().contains("broken.png"));
    }

    #[test]
    fn test_sticker_output_path() {
        let out = ImageIOService::sticker_output_path(Path::new("/tmp/cats/tabby.jpg"), StickerFormat::WebP);
        assert_eq!(out, PathBuf::from("/tmp/cats/tabby_sticker.webp"));

        let out = ImageIOService::sticker_output_path(Path::new("dog.png"), StickerFormat::Png);
        assert_eq!(out, PathBuf::from("dog_sticker.png"));
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(ImageIOService::detect_format(&png_bytes(1, 1)), Some("png"));
        assert_eq!(ImageIOService::detect_format(b"hello"), None);
    }
}
