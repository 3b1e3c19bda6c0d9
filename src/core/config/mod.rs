//! Configuration management for the layout pipeline.
//!
//! This module provides the configuration value passed to every task, the
//! ordered region class map and the worker pool policy.

pub mod classes;
pub mod dataset;
pub mod parallel;

// Re-export commonly used types
pub use classes::{ClassEntry, ClassMap, code_to_unit};
pub use dataset::{DatasetConfig, LINES_ONLY_HALF_WIDTH, OutputSize};
pub use parallel::ParallelPolicy;
