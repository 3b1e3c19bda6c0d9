//! Image loading, resizing and placement helpers.

use std::fs;
use std::path::Path;

use image::imageops::FilterType;
use image::{RgbImage, imageops};

use crate::core::{LayoutError, LayoutResult, OutputSize, ProcessingStage};

/// File extensions accepted as page images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

/// Returns true if the path has one of [`IMAGE_EXTENSIONS`] (case-insensitive).
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Loads an image from a file path and converts it to RGB.
pub fn load_image(path: &Path) -> LayoutResult<RgbImage> {
    let img = image::open(path)?;
    Ok(img.to_rgb8())
}

/// Resizes an image to `out_size` with cubic (Catmull-Rom) interpolation.
pub fn resize_image(image: &RgbImage, out_size: OutputSize) -> LayoutResult<RgbImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(LayoutError::processing_error(
            ProcessingStage::Resize,
            "source image is empty",
            std::io::Error::new(std::io::ErrorKind::InvalidData, "zero-sized image"),
        ));
    }
    Ok(imageops::resize(
        image,
        out_size.cols,
        out_size.rows,
        FilterType::CatmullRom,
    ))
}

/// Places `target` at `link`, replacing whatever is already there.
///
/// Uses a symbolic link on Unix and falls back to a copy elsewhere.
pub fn link_or_copy(target: &Path, link: &Path) -> LayoutResult<()> {
    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent)?;
    }
    if link.symlink_metadata().is_ok() {
        fs::remove_file(link)?;
    }
    let target = fs::canonicalize(target)?;

    #[cfg(unix)]
    std::os::unix::fs::symlink(&target, link)?;
    #[cfg(not(unix))]
    fs::copy(&target, link)?;

    Ok(())
}
