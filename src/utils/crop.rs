//! Polygon based image cropping utilities.

use image::{RgbImage, imageops};

use crate::processors::Polygon;

/// Axis-aligned crop window `[x1, x2) x [y1, y2)` inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl CropWindow {
    /// Computes the bounding window of a polygon, clamped to the image.
    ///
    /// The maximum coordinates are exclusive. Returns `None` for empty
    /// polygons and for windows with no area after clamping.
    pub fn from_polygon(polygon: &Polygon, width: u32, height: u32) -> Option<Self> {
        if polygon.is_empty() {
            return None;
        }

        let x1 = (polygon.x_min().max(0.0) as u32).min(width.saturating_sub(1));
        let y1 = (polygon.y_min().max(0.0) as u32).min(height.saturating_sub(1));
        let x2 = (polygon.x_max().max(0.0) as u32).min(width);
        let y2 = (polygon.y_max().max(0.0) as u32).min(height);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Self { x1, y1, x2, y2 })
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// Copies the window out of an RGB image.
    pub fn crop_rgb(&self, image: &RgbImage) -> RgbImage {
        imageops::crop_imm(image, self.x1, self.y1, self.width(), self.height()).to_image()
    }
}
