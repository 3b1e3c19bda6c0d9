//! Utility functions for the layout pipeline.
//!
//! This module provides image loading and resizing helpers, polygon cropping
//! and logging setup.

pub mod crop;
pub mod image;

pub use crop::CropWindow;
pub use image::{IMAGE_EXTENSIONS, is_image_file, link_or_copy, load_image, resize_image};

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` fmt subscriber writing to stderr.
///
/// The filter is read from `RUST_LOG` and defaults to `info`. Calling this more
/// than once is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
