//! Domain types of the layout pipeline.
//!
//! - [`page`]: the vector annotation aggregate (page, regions, lines, baselines)
//!   and its rasterization into training masks.
//! - [`page_xml`]: reading and writing that aggregate as PAGE XML.

pub mod page;
pub mod page_xml;

pub use page::{Baseline, LinePolygon, Page, RegionPolygon};
pub use page_xml::{read_page, write_page};
