//! Error handling for the layout pipeline.

mod types;

pub use types::{LayoutError, LayoutResult, ProcessingStage};
