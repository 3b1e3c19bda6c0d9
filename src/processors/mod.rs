//! Image and mask processing stages.
//!
//! This module contains the geometric machinery of the pipeline:
//! - Polygon geometry (area, hull, simplification)
//! - Raster primitives behind the [`RasterOps`] seam
//! - Baseline polyline approximation
//! - Baseline extraction and mask vectorization

pub mod baseline;
pub mod geometry;
pub mod polyapprox;
pub mod raster;
pub mod types;
pub mod vectorize;

pub use baseline::BaselineExtractor;
pub use geometry::{Point, Polygon};
pub use raster::{ImageprocRaster, RasterOps};
pub use types::{ApproxMode, BaselineConfig};
pub use vectorize::{MaskVectorizer, PredictionMasks};
