//! Training dataset preparation and PAGE generation.
//!
//! - [`sample`]: the per-image worker producing resized images, label and weight blobs.
//! - [`builder`]: the parallel run over all samples and its manifests.
//! - [`page_gen`]: PAGE files generated from model predictions.

pub mod builder;
pub mod page_gen;
pub mod sample;

pub use builder::{DatasetBuilder, Manifests};
pub use page_gen::PageGenerator;
pub use sample::{
    Sample, SampleArtifacts, discover_samples, inverse_frequency_weights, process_sample,
};
