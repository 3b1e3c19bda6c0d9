//! Raster geometry operations backed by imageproc.
//!
//! Binary masks are `GrayImage`s holding 0 (background) or 255 (foreground).
//! Normalized masks are `ndarray` arrays indexed `[row, col]`.

use std::fmt::Debug;

use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::morphology;
use imageproc::point::Point as ImageProcPoint;
use ndarray::{Array2, ArrayView2};

use super::geometry::{Point, Polygon};

/// Foreground value of binary masks.
pub const FOREGROUND: u8 = 255;

/// Raster primitives the vectorizer and the rasterizers are built on.
pub trait RasterOps: Debug + Send + Sync {
    /// Marks cells strictly inside `(lower, upper)`.
    fn band_threshold(&self, data: &ArrayView2<f32>, lower: f32, upper: f32) -> GrayImage;

    /// Marks cells strictly above `threshold`.
    fn above_threshold(&self, data: &ArrayView2<f32>, threshold: f32) -> GrayImage;

    /// Traces the outer boundaries of the top-level connected components.
    ///
    /// Holes and components nested inside holes are ignored.
    fn external_contours(&self, mask: &GrayImage) -> Vec<Polygon>;

    /// Fills a polygon, boundary included, with `value`.
    fn fill_polygon(&self, canvas: &mut GrayImage, polygon: &Polygon, value: u8);

    /// Strokes an open polyline with the given width.
    fn draw_polyline(&self, canvas: &mut GrayImage, points: &[Point], value: u8, width: u32);

    /// Erodes a binary mask with a square neighbourhood of the given radius.
    fn erode(&self, mask: &GrayImage, radius: u8) -> GrayImage;

    /// Dilates a binary mask with a square neighbourhood of the given radius.
    fn dilate(&self, mask: &GrayImage, radius: u8) -> GrayImage;

    /// Binarizes a grayscale image with the Otsu threshold: pixels above the
    /// level become 255, the rest 0.
    fn binarize_otsu(&self, gray: &GrayImage) -> GrayImage;
}

/// [`RasterOps`] implementation on top of `imageproc`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageprocRaster;

impl RasterOps for ImageprocRaster {
    fn band_threshold(&self, data: &ArrayView2<f32>, lower: f32, upper: f32) -> GrayImage {
        mask_from_fn(data, |v| v > lower && v < upper)
    }

    fn above_threshold(&self, data: &ArrayView2<f32>, threshold: f32) -> GrayImage {
        mask_from_fn(data, |v| v > threshold)
    }

    fn external_contours(&self, mask: &GrayImage) -> Vec<Polygon> {
        find_contours::<i32>(mask)
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(Polygon::from_contour)
            .collect()
    }

    fn fill_polygon(&self, canvas: &mut GrayImage, polygon: &Polygon, value: u8) {
        let mut points: Vec<ImageProcPoint<i32>> = polygon.to_imageproc_points();
        points.dedup();
        while points.len() > 1 && points.first() == points.last() {
            points.pop();
        }

        match points.len() {
            0 => {}
            1 => put_pixel_checked(canvas, points[0].x, points[0].y, value),
            2 => draw_line_segment_mut(
                canvas,
                (points[0].x as f32, points[0].y as f32),
                (points[1].x as f32, points[1].y as f32),
                Luma([value]),
            ),
            _ => draw_polygon_mut(canvas, &points, Luma([value])),
        }
    }

    fn draw_polyline(&self, canvas: &mut GrayImage, points: &[Point], value: u8, width: u32) {
        if width <= 1 {
            for pair in points.windows(2) {
                draw_line_segment_mut(
                    canvas,
                    (pair[0].x, pair[0].y),
                    (pair[1].x, pair[1].y),
                    Luma([value]),
                );
            }
            if let [single] = points {
                put_pixel_checked(canvas, single.x.round() as i32, single.y.round() as i32, value);
            }
            return;
        }

        let half = width as f32 / 2.0;
        let radius = (width / 2) as i32;
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (dx, dy) = (b.x - a.x, b.y - a.y);
            let length = (dx * dx + dy * dy).sqrt();
            if length < f32::EPSILON {
                continue;
            }
            // Offset along the segment normal
            let (nx, ny) = (-dy / length * half, dx / length * half);
            let quad = Polygon::new(vec![
                Point::new(a.x + nx, a.y + ny),
                Point::new(b.x + nx, b.y + ny),
                Point::new(b.x - nx, b.y - ny),
                Point::new(a.x - nx, a.y - ny),
            ]);
            self.fill_polygon(canvas, &quad, value);
        }
        // Round joints and caps
        for p in points {
            draw_filled_circle_mut(
                canvas,
                (p.x.round() as i32, p.y.round() as i32),
                radius,
                Luma([value]),
            );
        }
    }

    fn erode(&self, mask: &GrayImage, radius: u8) -> GrayImage {
        morphology::erode(mask, Norm::LInf, radius)
    }

    fn dilate(&self, mask: &GrayImage, radius: u8) -> GrayImage {
        morphology::dilate(mask, Norm::LInf, radius)
    }

    fn binarize_otsu(&self, gray: &GrayImage) -> GrayImage {
        let level = imageproc::contrast::otsu_level(gray);
        let mut out = gray.clone();
        for pixel in out.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > level { FOREGROUND } else { 0 };
        }
        out
    }
}

/// Pixel-wise product of two binary masks.
pub fn mask_product(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        let on = a.get_pixel(x, y).0[0] > 0 && b.get_pixel(x, y).0[0] > 0;
        Luma([if on { FOREGROUND } else { 0 }])
    })
}

/// Copies a gray image into a `[row, col]` array.
pub fn gray_to_array(image: &GrayImage) -> Array2<u8> {
    let (width, height) = image.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(r, c)| {
        image.get_pixel(c as u32, r as u32).0[0]
    })
}

fn mask_from_fn(data: &ArrayView2<f32>, predicate: impl Fn(f32) -> bool) -> GrayImage {
    let (rows, cols) = data.dim();
    GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        let on = predicate(data[[y as usize, x as usize]]);
        Luma([if on { FOREGROUND } else { 0 }])
    })
}

fn put_pixel_checked(canvas: &mut GrayImage, x: i32, y: i32, value: u8) {
    if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
        canvas.put_pixel(x as u32, y as u32, Luma([value]));
    }
}
