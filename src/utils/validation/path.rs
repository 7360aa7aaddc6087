//! Path validation utilities

use crate::error::{Result, StickerError};
use std::path::Path;

/// Extensions accepted as sticker sources when expanding directories
const SUPPORTED_INPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "gif", "tif", "tiff"];

/// Validator for file system paths and extensions
pub struct PathValidator;

impl PathValidator {
    /// Validate that a file exists
    ///
    /// # Errors
    /// `Io` with `NotFound`.
    pub fn validate_file_exists<P: AsRef<Path>>(path: P) -> Result<()> {
        let path_ref = path.as_ref();
        if !path_ref.exists() {
            return Err(StickerError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File does not exist: {}", path_ref.display()),
            )));
        }
        Ok(())
    }

    /// Check if a file path has a supported input image extension
    pub fn is_supported_image_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                SUPPORTED_INPUT_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false)
    }

    #[must_use]
    pub fn supported_image_extensions() -> &'static [&'static str] {
        SUPPORTED_INPUT_EXTENSIONS
    }

    /// Whether an input argument names a remote image
    pub fn is_url(input: &str) -> bool {
        let lower = input.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    /// Create parent directories if they don't exist
    ///
    /// # Errors
    /// `Io` when directories cannot be created.
    pub fn ensure_parent_dirs<P: AsRef<Path>>(path: P) -> Result<()> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StickerError::file_io_error("create directory", parent, &e))?;
            }
        }
        Ok(())
    }
}
