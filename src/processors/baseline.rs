//! Column-wise baseline estimation for text line polygons.
//!
//! The [`BaselineExtractor`] crops the line's bounding window, binarizes it with
//! Otsu's threshold, blanks everything outside the line polygon and takes, for
//! every column, the lowest row holding ink. The resulting anchors are then
//! reduced according to the configured [`ApproxMode`].

use std::sync::Arc;

use image::{GrayImage, RgbImage, imageops};

use crate::domain::Baseline;
use crate::processors::geometry::{Point, Polygon};
use crate::processors::polyapprox::{norm_trace, one_axis_delta, poly_approx, subsample_evenly};
use crate::processors::raster::{FOREGROUND, ImageprocRaster, RasterOps};
use crate::processors::types::{ApproxMode, BaselineConfig};
use crate::utils::CropWindow;

/// Number of anchors handed to the optimal polyline fit.
pub const OPTIMAL_SAMPLE_POINTS: usize = 100;

/// Estimates baselines of text line polygons.
#[derive(Debug, Clone)]
pub struct BaselineExtractor {
    raster: Arc<dyn RasterOps>,
    config: BaselineConfig,
}

impl BaselineExtractor {
    /// Creates an extractor backed by [`ImageprocRaster`].
    pub fn new(config: BaselineConfig) -> Self {
        Self {
            raster: Arc::new(ImageprocRaster),
            config,
        }
    }

    /// Replaces the raster backend.
    pub fn with_raster(mut self, raster: Arc<dyn RasterOps>) -> Self {
        self.raster = raster;
        self
    }

    pub fn config(&self) -> &BaselineConfig {
        &self.config
    }

    /// Estimates the baseline of `polygon` (image coordinates) on `image`.
    ///
    /// Returns `None` when the polygon's window is empty or no column holds ink.
    pub fn extract(&self, image: &RgbImage, polygon: &Polygon) -> Option<Baseline> {
        let window = CropWindow::from_polygon(polygon, image.width(), image.height())?;
        let crop = window.crop_rgb(image);
        let gray = imageops::grayscale(&crop);
        let mut binary = self.raster.binarize_otsu(&gray);

        let mut inside = GrayImage::new(window.width(), window.height());
        let local = polygon.translate(-(window.x1 as f32), -(window.y1 as f32));
        self.raster.fill_polygon(&mut inside, &local, FOREGROUND);
        for (pixel, keep) in binary.pixels_mut().zip(inside.pixels()) {
            if keep.0[0] == 0 {
                pixel.0[0] = FOREGROUND;
            }
        }

        let anchors = column_anchors(&binary);
        if anchors.is_empty() {
            return None;
        }

        let points = self.simplify(anchors);
        Some(Baseline::new(points).translate(window.x1 as f32, window.y1 as f32))
    }

    fn simplify(&self, anchors: Vec<Point>) -> Vec<Point> {
        let k = self.config.num_segments;
        match self.config.mode {
            ApproxMode::Raw => anchors,
            ApproxMode::Optimal => {
                let sampled = subsample_evenly(&anchors, OPTIMAL_SAMPLE_POINTS);
                poly_approx(&sampled, k, one_axis_delta).1
            }
            ApproxMode::Trace => norm_trace(&anchors, k),
        }
    }
}

/// Lowest ink row of every column of a binary image (ink = 0).
///
/// The anchor is the first row where the running ink count reaches its column
/// maximum. Columns whose anchor is row 0 are skipped.
fn column_anchors(binary: &GrayImage) -> Vec<Point> {
    let (width, height) = binary.dimensions();
    let mut anchors = Vec::new();
    for x in 0..width {
        let mut cumulative = 0u32;
        let mut best = 0u32;
        let mut anchor = 0u32;
        for y in 0..height {
            cumulative += u32::from(FOREGROUND - binary.get_pixel(x, y).0[0]);
            if cumulative > best {
                best = cumulative;
                anchor = y;
            }
        }
        if anchor > 0 {
            anchors.push(Point::new(x as f32, anchor as f32));
        }
    }
    anchors
}
