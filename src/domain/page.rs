//! Vector layout annotations of one page image.
//!
//! A [`Page`] owns its regions, every [`RegionPolygon`] owns its text lines and
//! every [`LinePolygon`] owns its [`Baseline`]. The same aggregate is produced
//! by the vectorizer and read back from ground-truth PAGE files.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::core::{ClassMap, LayoutError, LayoutResult, OutputSize};
use crate::processors::geometry::{Point, Polygon};
use crate::processors::raster::RasterOps;

/// Ordered point sequence a text line sits on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub points: Vec<Point>,
}

impl Baseline {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns a copy translated by `(dx, dy)`.
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(
            self.points
                .iter()
                .map(|p| Point::new(p.x + dx, p.y + dy))
                .collect(),
        )
    }
}

/// A text line polygon and its baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePolygon {
    pub id: String,
    pub coords: Polygon,
    pub baseline: Baseline,
}

/// A region of one semantic class and the text lines inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPolygon {
    pub id: String,
    /// Region class name, e.g. `paragraph`.
    pub class: String,
    pub coords: Polygon,
    pub lines: Vec<LinePolygon>,
}

/// Vector annotation of one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// File name of the annotated image.
    pub image_filename: String,
    /// Width of the annotated image, in pixels.
    pub image_width: u32,
    /// Height of the annotated image, in pixels.
    pub image_height: u32,
    pub regions: Vec<RegionPolygon>,
}

impl Page {
    pub fn new(image_filename: impl Into<String>, image_width: u32, image_height: u32) -> Self {
        Self {
            image_filename: image_filename.into(),
            image_width,
            image_height,
            regions: Vec::new(),
        }
    }

    /// Iterates over every text line of every region.
    pub fn lines(&self) -> impl Iterator<Item = &LinePolygon> {
        self.regions.iter().flat_map(|r| r.lines.iter())
    }

    /// Scale factors from page coordinates to `out_size`.
    fn scale_to(&self, out_size: OutputSize) -> LayoutResult<(f32, f32)> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(LayoutError::invalid_input(format!(
                "page '{}' has no image size",
                self.image_filename
            )));
        }
        Ok((
            out_size.cols as f32 / self.image_width as f32,
            out_size.rows as f32 / self.image_height as f32,
        ))
    }

    /// Rasterizes every baseline at `out_size` with the given stroke code and width.
    pub fn baseline_mask(
        &self,
        out_size: OutputSize,
        color: u8,
        width: u32,
        raster: &dyn RasterOps,
    ) -> LayoutResult<GrayImage> {
        let (sx, sy) = self.scale_to(out_size)?;
        let mut mask = GrayImage::new(out_size.cols, out_size.rows);
        for line in self.lines().filter(|l| !l.baseline.is_empty()) {
            let points: Vec<Point> = line
                .baseline
                .points
                .iter()
                .map(|p| Point::new(p.x * sx, p.y * sy))
                .collect();
            raster.draw_polyline(&mut mask, &points, color, width);
        }
        Ok(mask)
    }

    /// Rasterizes region polygons at `out_size`, each filled with its class code.
    ///
    /// Regions whose class is not in `classes` are left as background.
    pub fn region_mask(
        &self,
        out_size: OutputSize,
        classes: &ClassMap,
        raster: &dyn RasterOps,
    ) -> LayoutResult<GrayImage> {
        let (sx, sy) = self.scale_to(out_size)?;
        let mut mask = GrayImage::new(out_size.cols, out_size.rows);
        for region in &self.regions {
            let Some(code) = classes.code(&region.class) else {
                tracing::debug!(
                    "skipping region {} of unknown class '{}'",
                    region.id,
                    region.class
                );
                continue;
            };
            let scaled = Polygon::new(
                region
                    .coords
                    .points
                    .iter()
                    .map(|p| Point::new(p.x * sx, p.y * sy))
                    .collect(),
            );
            raster.fill_polygon(&mut mask, &scaled, code);
        }
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::raster::ImageprocRaster;

    fn sample_page() -> Page {
        let mut page = Page::new("p.png", 400, 200);
        page.regions.push(RegionPolygon {
            id: "r1".into(),
            class: "paragraph".into(),
            coords: Polygon::from_coords(0.0, 0.0, 198.0, 98.0),
            lines: vec![LinePolygon {
                id: "r1_l0".into(),
                coords: Polygon::from_coords(20.0, 40.0, 180.0, 60.0),
                baseline: Baseline::new(vec![Point::new(20.0, 60.0), Point::new(180.0, 60.0)]),
            }],
        });
        page.regions.push(RegionPolygon {
            id: "r2".into(),
            class: "stamp".into(),
            coords: Polygon::from_coords(300.0, 150.0, 390.0, 190.0),
            lines: Vec::new(),
        });
        page
    }

    #[test]
    fn test_region_mask_scales_and_uses_codes() {
        let classes = ClassMap::parse("paragraph=64,marginalia=192").unwrap();
        let mask = sample_page()
            .region_mask(OutputSize::new(100, 200), &classes, &ImageprocRaster)
            .unwrap();
        assert_eq!(mask.dimensions(), (200, 100));
        assert_eq!(mask.get_pixel(10, 10).0[0], 64);
        assert_eq!(mask.get_pixel(99, 49).0[0], 64);
        assert_eq!(mask.get_pixel(120, 10).0[0], 0);
        // Unknown class stays background
        assert_eq!(mask.get_pixel(170, 85).0[0], 0);
    }

    #[test]
    fn test_baseline_mask_draws_scaled_lines() {
        let mask = sample_page()
            .baseline_mask(OutputSize::new(100, 200), 128, 3, &ImageprocRaster)
            .unwrap();
        assert_eq!(mask.get_pixel(50, 30).0[0], 128);
        assert_eq!(mask.get_pixel(50, 20).0[0], 0);
    }

    #[test]
    fn test_masks_require_image_size() {
        let page = Page::new("p.png", 0, 0);
        let classes = ClassMap::default();
        assert!(
            page.region_mask(OutputSize::new(10, 10), &classes, &ImageprocRaster)
                .is_err()
        );
    }
}
