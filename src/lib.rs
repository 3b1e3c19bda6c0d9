//! # htr-layout
//!
//! Layout analysis data preparation for handwritten text recognition.
//!
//! The crate turns PAGE XML ground truth into training images, label masks and
//! class-balancing weights, and turns predicted layout masks back into PAGE
//! annotations: text regions, the text lines inside them and their baselines.
//!
//! ## Modules
//!
//! * [`core`] - configuration and error types
//! * [`domain`] - the page annotation model and its PAGE XML store
//! * [`processors`] - raster geometry, baseline extraction and mask vectorization
//! * [`dataset`] - the per-sample worker, the parallel builder and PAGE generation
//! * [`utils`] - image helpers, cropping and logging setup
//!
//! ## Example
//!
//! ```rust,no_run
//! use htr_layout::core::{ClassMap, DatasetConfig, OutputSize};
//! use htr_layout::dataset::{DatasetBuilder, discover_samples};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let classes = ClassMap::parse("paragraph=64,marginalia=192")?;
//! let config = DatasetConfig::new(OutputSize::new(1024, 768), "train_out", classes);
//! let samples = discover_samples(Path::new("train"), config.out_size)?;
//! let manifests = DatasetBuilder::new(config)?.build(&samples)?;
//! println!("images listed in {}", manifests.images.display());
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod dataset;
pub mod domain;
pub mod processors;
pub mod utils;

pub use crate::core::{DatasetConfig, LayoutError, LayoutResult};
pub use crate::dataset::{DatasetBuilder, PageGenerator};
pub use crate::processors::{BaselineExtractor, MaskVectorizer};
