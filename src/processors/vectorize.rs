//! Conversion of predicted layout masks into region, line and baseline polygons.
//!
//! Region classes are recovered from the region mask with a symmetric band
//! around each class code. Every region contour is filled, opened with a 5x5
//! neighbourhood and intersected with the binarized line mask; the outer
//! contours of that product are the region's text line candidates. Regions
//! without a surviving line are dropped.

use std::sync::Arc;

use image::{GrayImage, RgbImage};
use ndarray::{Array2, ArrayD, Axis, Ix2, Ix3};

use crate::core::{
    ClassEntry, DatasetConfig, LayoutError, LayoutResult, OutputSize, code_to_unit,
};
use crate::domain::{LinePolygon, Page, RegionPolygon};
use crate::processors::baseline::BaselineExtractor;
use crate::processors::geometry::Polygon;
use crate::processors::raster::{FOREGROUND, ImageprocRaster, RasterOps, mask_product};

/// Class assigned to the synthetic region of lines-only predictions.
pub const FULL_PAGE_CLASS: &str = "full_page";
/// Intensity code of [`FULL_PAGE_CLASS`].
pub const FULL_PAGE_CODE: u8 = 128;
/// Radius of the square neighbourhood used to open region fills (5x5).
pub const MORPH_RADIUS: u8 = 2;
/// Region simplification tolerance, as a fraction of the contour perimeter.
pub const SIMPLIFY_RATIO: f32 = 0.005;
/// Contours with fewer vertices are discarded.
pub const MIN_CONTOUR_POINTS: usize = 4;

/// Model output for one page, in the normalized `-1..=1` range, indexed `[row, col]`.
#[derive(Debug, Clone)]
pub struct PredictionMasks {
    /// Baseline (line ink) channel.
    pub lines: Array2<f32>,
    /// Region class channel; absent for lines-only models.
    pub regions: Option<Array2<f32>>,
}

impl PredictionMasks {
    pub fn lines_only(lines: Array2<f32>) -> Self {
        Self {
            lines,
            regions: None,
        }
    }

    pub fn with_regions(lines: Array2<f32>, regions: Array2<f32>) -> Self {
        Self {
            lines,
            regions: Some(regions),
        }
    }

    /// Splits a stored prediction: `(rows, cols)` or `(1, rows, cols)` holds lines
    /// only, `(2, rows, cols)` holds lines in channel 0 and regions in channel 1.
    pub fn from_array(array: ArrayD<f32>) -> LayoutResult<Self> {
        let shape = array.shape().to_vec();
        match shape.as_slice() {
            [_, _] => Ok(Self::lines_only(array.into_dimensionality::<Ix2>()?)),
            [1, _, _] => {
                let stacked = array.into_dimensionality::<Ix3>()?;
                Ok(Self::lines_only(stacked.index_axis(Axis(0), 0).to_owned()))
            }
            [2, _, _] => {
                let stacked = array.into_dimensionality::<Ix3>()?;
                Ok(Self::with_regions(
                    stacked.index_axis(Axis(0), 0).to_owned(),
                    stacked.index_axis(Axis(0), 1).to_owned(),
                ))
            }
            shape => Err(LayoutError::invalid_input(format!(
                "unsupported prediction shape {shape:?}"
            ))),
        }
    }
}

/// Turns predicted masks into a region/line hierarchy in image coordinates.
#[derive(Debug, Clone)]
pub struct MaskVectorizer {
    out_size: OutputSize,
    line_color: u8,
    half_width: f32,
    min_area: f32,
    only_lines: bool,
    raster: Arc<dyn RasterOps>,
    baseline: BaselineExtractor,
}

impl MaskVectorizer {
    /// Builds a vectorizer from the dataset configuration.
    pub fn new(config: &DatasetConfig) -> LayoutResult<Self> {
        Ok(Self {
            out_size: config.out_size,
            line_color: config.line_color,
            half_width: config.region_half_width()?,
            min_area: config.min_area(),
            only_lines: config.only_lines,
            raster: Arc::new(ImageprocRaster),
            baseline: BaselineExtractor::new(config.baseline),
        })
    }

    /// Replaces the raster backend of the vectorizer and its baseline extractor.
    pub fn with_raster(mut self, raster: Arc<dyn RasterOps>) -> Self {
        self.baseline = self.baseline.with_raster(Arc::clone(&raster));
        self.raster = raster;
        self
    }

    /// Vectorizes one page and wraps the regions into a [`Page`].
    pub fn vectorize_page(
        &self,
        image: &RgbImage,
        image_filename: &str,
        masks: &PredictionMasks,
        classes: &[ClassEntry],
    ) -> LayoutResult<Page> {
        let mut page = Page::new(image_filename, image.width(), image.height());
        page.regions = self.vectorize(image, masks, classes)?;
        Ok(page)
    }

    /// Extracts the regions of every class in `classes`, in that order.
    ///
    /// In lines-only mode `classes` is ignored and the whole page is treated as a
    /// single [`FULL_PAGE_CLASS`] region.
    pub fn vectorize(
        &self,
        image: &RgbImage,
        masks: &PredictionMasks,
        classes: &[ClassEntry],
    ) -> LayoutResult<Vec<RegionPolygon>> {
        let shape = self.out_size.shape();
        if masks.lines.dim() != shape {
            return Err(LayoutError::invalid_input(format!(
                "line mask shape {:?} does not match output size {:?}",
                masks.lines.dim(),
                shape
            )));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(LayoutError::invalid_input("empty source image"));
        }

        let full_page;
        let (region_data, classes) = if self.only_lines {
            full_page = [ClassEntry::new(FULL_PAGE_CLASS, FULL_PAGE_CODE)];
            (Array2::<f32>::zeros(shape), &full_page[..])
        } else {
            let regions = masks.regions.as_ref().ok_or_else(|| {
                LayoutError::invalid_input("region mask required unless only_lines is set")
            })?;
            if regions.dim() != shape {
                return Err(LayoutError::invalid_input(format!(
                    "region mask shape {:?} does not match output size {:?}",
                    regions.dim(),
                    shape
                )));
            }
            (regions.clone(), classes)
        };
        let line_threshold = (-1.0 - code_to_unit(f32::from(self.line_color))) / 2.0;
        let ink = self
            .raster
            .above_threshold(&masks.lines.view(), line_threshold);

        let scale = (
            image.width() as f32 / self.out_size.cols as f32,
            image.height() as f32 / self.out_size.rows as f32,
        );

        let mut regions = Vec::new();
        let mut region_counter = 0usize;
        for class in classes {
            let code = f32::from(class.code);
            let binary = self.raster.band_threshold(
                &region_data.view(),
                code_to_unit(code - self.half_width),
                code_to_unit(code + self.half_width),
            );

            for contour in self.raster.external_contours(&binary) {
                if !self.is_significant(&contour) {
                    continue;
                }
                region_counter += 1;
                let region_id = format!("r{region_counter}");

                let lines = self.region_lines(image, &contour, &ink, &region_id, scale);
                if lines.is_empty() {
                    tracing::debug!(
                        "dropping region {} ({}): no text lines",
                        region_id,
                        class.name
                    );
                    continue;
                }

                let coords = contour
                    .approx_poly_dp(SIMPLIFY_RATIO * contour.perimeter())
                    .rescale(scale.0, scale.1);
                regions.push(RegionPolygon {
                    id: region_id,
                    class: class.name.clone(),
                    coords,
                    lines,
                });
            }
        }

        tracing::debug!(
            "vectorized {} regions with {} lines",
            regions.len(),
            regions.iter().map(|r| r.lines.len()).sum::<usize>()
        );
        Ok(regions)
    }

    fn is_significant(&self, contour: &Polygon) -> bool {
        contour.len() >= MIN_CONTOUR_POINTS && contour.area() >= self.min_area
    }

    /// Finds the text lines of one region contour (mask coordinates).
    fn region_lines(
        &self,
        image: &RgbImage,
        contour: &Polygon,
        ink: &GrayImage,
        region_id: &str,
        (sx, sy): (f32, f32),
    ) -> Vec<LinePolygon> {
        let mut fill = GrayImage::new(self.out_size.cols, self.out_size.rows);
        self.raster.fill_polygon(&mut fill, contour, FOREGROUND);
        let opened = self
            .raster
            .dilate(&self.raster.erode(&fill, MORPH_RADIUS), MORPH_RADIUS);
        let region_ink = mask_product(&opened, ink);

        let mut lines = Vec::new();
        for (index, candidate) in self
            .raster
            .external_contours(&region_ink)
            .into_iter()
            .enumerate()
        {
            if !self.is_significant(&candidate) {
                continue;
            }
            let candidate = if candidate.is_convex() {
                candidate
            } else {
                candidate.convex_hull()
            };
            let coords = candidate.rescale(sx, sy);
            let Some(baseline) = self.baseline.extract(image, &coords) else {
                continue;
            };
            lines.push(LinePolygon {
                id: format!("{region_id}_l{index}"),
                coords,
                baseline,
            });
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ClassMap;
    use crate::processors::geometry::Point;
    use image::Rgb;
    use ndarray::ArrayView2;
    use std::ops::RangeInclusive;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const BACKGROUND: f32 = -1.0;

    fn config(only_lines: bool) -> DatasetConfig {
        DatasetConfig::new(
            OutputSize::new(100, 200),
            "out",
            ClassMap::parse("paragraph=64,marginalia=192").unwrap(),
        )
        .with_only_lines(only_lines)
    }

    fn fill(
        mask: &mut Array2<f32>,
        rows: RangeInclusive<usize>,
        cols: RangeInclusive<usize>,
        value: f32,
    ) {
        for r in rows {
            for c in cols.clone() {
                mask[[r, c]] = value;
            }
        }
    }

    /// Prediction with one paragraph rectangle and one ink band inside it.
    fn paragraph_prediction() -> PredictionMasks {
        let mut regions = Array2::from_elem((100, 200), BACKGROUND);
        fill(&mut regions, 10..=90, 10..=189, code_to_unit(64.0));
        let mut lines = Array2::from_elem((100, 200), BACKGROUND);
        fill(&mut lines, 45..=55, 20..=179, 1.0);
        PredictionMasks::with_regions(lines, regions)
    }

    /// Source image with dark text rows `49..=50`, scaled by `factor`.
    fn page_image(factor: u32) -> RgbImage {
        RgbImage::from_fn(200 * factor, 100 * factor, |x, y| {
            let (x, y) = (x / factor, y / factor);
            if (20..180).contains(&x) && (49..=50).contains(&y) {
                Rgb([10, 10, 10])
            } else {
                Rgb([245, 245, 245])
            }
        })
    }

    fn classes() -> Vec<ClassEntry> {
        config(false).classes.entries().to_vec()
    }

    #[test]
    fn test_single_region_single_line() {
        let vectorizer = MaskVectorizer::new(&config(false)).unwrap();
        let regions = vectorizer
            .vectorize(&page_image(1), &paragraph_prediction(), &classes())
            .unwrap();

        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!(region.id, "r1");
        assert_eq!(region.class, "paragraph");
        assert_eq!(region.lines.len(), 1);
        assert_eq!(region.lines[0].id, "r1_l0");

        let baseline = &region.lines[0].baseline;
        assert!(!baseline.is_empty());
        assert!(baseline.points.iter().all(|p| (p.y - 50.0).abs() <= 1.0));
    }

    #[test]
    fn test_coordinates_are_rescaled_to_the_image() {
        let vectorizer = MaskVectorizer::new(&config(false)).unwrap();
        let regions = vectorizer
            .vectorize(&page_image(2), &paragraph_prediction(), &classes())
            .unwrap();
        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!(region.coords.x_min(), 20.0);
        assert_eq!(region.coords.x_max(), 378.0);
        assert_eq!(region.coords.y_max(), 180.0);
        let line = &region.lines[0];
        assert_eq!(line.coords.y_min(), 90.0);
        assert_eq!(line.coords.y_max(), 110.0);
        // Ink band rows 45..=55 scale to 90..=110
        assert!(line.baseline.points.iter().all(|p| (p.y - 100.0).abs() <= 1.0));
    }

    #[test]
    fn test_contours_below_min_area_are_dropped() {
        let mut masks = paragraph_prediction();
        let regions = masks.regions.as_mut().unwrap();
        // 3x3 paragraph with ink: area 4 < min area 10
        fill(regions, 94..=96, 100..=102, code_to_unit(64.0));
        fill(&mut masks.lines, 94..=96, 100..=102, 1.0);
        // Small ink speck inside the big paragraph
        fill(&mut masks.lines, 70..=71, 50..=52, 1.0);

        let vectorizer = MaskVectorizer::new(&config(false)).unwrap();
        let found = vectorizer
            .vectorize(&page_image(1), &masks, &classes())
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].lines.len(), 1);
        for region in &found {
            assert!(region.coords.area() >= 10.0);
            for line in &region.lines {
                assert!(line.coords.area() >= 10.0);
            }
        }
    }

    #[test]
    fn test_region_without_ink_is_absent() {
        let mut masks = paragraph_prediction();
        masks.lines.fill(BACKGROUND);
        let vectorizer = MaskVectorizer::new(&config(false)).unwrap();
        let found = vectorizer
            .vectorize(&page_image(1), &masks, &classes())
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_marginalia_band_does_not_capture_paragraphs() {
        let vectorizer = MaskVectorizer::new(&config(false)).unwrap();
        let marginalia = [ClassEntry::new("marginalia", 192)];
        let found = vectorizer
            .vectorize(&page_image(1), &paragraph_prediction(), &marginalia)
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_lines_only_uses_full_page_region() {
        let mut lines = Array2::from_elem((100, 200), BACKGROUND);
        fill(&mut lines, 45..=55, 20..=179, 1.0);
        let vectorizer = MaskVectorizer::new(&config(true)).unwrap();
        let page = vectorizer
            .vectorize_page(&page_image(1), "p.png", &PredictionMasks::lines_only(lines), &[])
            .unwrap();
        assert_eq!(page.image_width, 200);
        assert_eq!(page.regions.len(), 1);
        assert_eq!(page.regions[0].class, FULL_PAGE_CLASS);
        assert_eq!(page.lines().count(), 1);
    }

    #[test]
    fn test_shape_mismatch_and_missing_regions() {
        let vectorizer = MaskVectorizer::new(&config(false)).unwrap();
        let wrong = PredictionMasks::lines_only(Array2::from_elem((50, 200), BACKGROUND));
        assert!(vectorizer.vectorize(&page_image(1), &wrong, &classes()).is_err());
        let no_regions = PredictionMasks::lines_only(Array2::from_elem((100, 200), BACKGROUND));
        assert!(
            vectorizer
                .vectorize(&page_image(1), &no_regions, &classes())
                .is_err()
        );
    }

    /// Delegates to [`ImageprocRaster`] and counts a few calls.
    #[derive(Debug, Default)]
    struct CountingRaster {
        bands: AtomicUsize,
        erosions: AtomicUsize,
        binarizations: AtomicUsize,
    }

    impl RasterOps for CountingRaster {
        fn band_threshold(&self, data: &ArrayView2<f32>, lower: f32, upper: f32) -> GrayImage {
            self.bands.fetch_add(1, Ordering::SeqCst);
            ImageprocRaster.band_threshold(data, lower, upper)
        }

        fn above_threshold(&self, data: &ArrayView2<f32>, threshold: f32) -> GrayImage {
            ImageprocRaster.above_threshold(data, threshold)
        }

        fn external_contours(&self, mask: &GrayImage) -> Vec<Polygon> {
            ImageprocRaster.external_contours(mask)
        }

        fn fill_polygon(&self, canvas: &mut GrayImage, polygon: &Polygon, value: u8) {
            ImageprocRaster.fill_polygon(canvas, polygon, value)
        }

        fn draw_polyline(&self, canvas: &mut GrayImage, points: &[Point], value: u8, width: u32) {
            ImageprocRaster.draw_polyline(canvas, points, value, width)
        }

        fn erode(&self, mask: &GrayImage, radius: u8) -> GrayImage {
            self.erosions.fetch_add(1, Ordering::SeqCst);
            ImageprocRaster.erode(mask, radius)
        }

        fn dilate(&self, mask: &GrayImage, radius: u8) -> GrayImage {
            ImageprocRaster.dilate(mask, radius)
        }

        fn binarize_otsu(&self, gray: &GrayImage) -> GrayImage {
            self.binarizations.fetch_add(1, Ordering::SeqCst);
            ImageprocRaster.binarize_otsu(gray)
        }
    }

    #[test]
    fn test_custom_raster_backend_is_used() {
        let raster = Arc::new(CountingRaster::default());
        let vectorizer = MaskVectorizer::new(&config(false))
            .unwrap()
            .with_raster(raster.clone());
        let regions = vectorizer
            .vectorize(&page_image(1), &paragraph_prediction(), &classes())
            .unwrap();

        assert_eq!(regions.len(), 1);
        // One band per class, one opening per region, one Otsu per line
        assert_eq!(raster.bands.load(Ordering::SeqCst), 2);
        assert_eq!(raster.erosions.load(Ordering::SeqCst), 1);
        assert_eq!(raster.binarizations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_prediction_from_array() {
        let stacked = ArrayD::<f32>::zeros(vec![2, 4, 6]);
        let masks = PredictionMasks::from_array(stacked).unwrap();
        assert_eq!(masks.lines.dim(), (4, 6));
        assert!(masks.regions.is_some());

        let flat = ArrayD::<f32>::zeros(vec![4, 6]);
        assert!(PredictionMasks::from_array(flat).unwrap().regions.is_none());
        assert!(PredictionMasks::from_array(ArrayD::<f32>::zeros(vec![3, 4, 6])).is_err());
    }
}
