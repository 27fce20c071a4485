//! Image persistence

use crate::error::{self, Error, Result};
use image::{DynamicImage, ImageError, ImageFormat};
use std::path::{Path, PathBuf};

/// Decode `image_bytes` and write them to `output_path`.
///
/// The output encoding follows the path's extension. Parent directories are
/// created as needed.
pub fn save_image_from_bytes(image_bytes: &[u8], output_path: impl AsRef<Path>) -> Result<PathBuf> {
    let output_path = output_path.as_ref();

    let mut image = image::load_from_memory(image_bytes).map_err(|e| {
        error::image_decode_failed(format!("cannot decode image payload: {}", e))
            .with_operation("image_io::save_image_from_bytes")
            .with_context("bytes", image_bytes.len().to_string())
            .set_source(e)
    })?;

    // JPEG has no alpha channel.
    if matches!(ImageFormat::from_path(output_path), Ok(ImageFormat::Jpeg)) && image.color().has_alpha() {
        image = DynamicImage::ImageRgb8(image.to_rgb8());
    }

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::from(e)
                .with_operation("image_io::save_image_from_bytes")
                .with_context("dir", parent.display().to_string())
        })?;
    }

    image.save(output_path).map_err(|e| {
        let err = match e {
            ImageError::IoError(io) => Error::from(io),
            other => error::io_error(format!("Failed to write {}: {}", output_path.display(), other)).set_source(other),
        };
        err.with_operation("image_io::save_image_from_bytes")
            .with_context("path", output_path.display().to_string())
    })?;

    tracing::info!(path = %output_path.display(), "Image successfully saved to '{}'", output_path.display());
    Ok(output_path.to_path_buf())
}
