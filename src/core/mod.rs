//! The core module of the layout pipeline.
//!
//! This module contains the fundamental components shared by every stage:
//! - Configuration management
//! - Error handling
//!
//! It also provides re-exports of commonly used types for convenience.

pub mod config;
pub mod errors;

pub use config::{
    ClassEntry, ClassMap, DatasetConfig, OutputSize, ParallelPolicy, code_to_unit,
};
pub use errors::{LayoutError, LayoutResult, ProcessingStage};
