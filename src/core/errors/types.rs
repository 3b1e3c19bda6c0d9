//! Core error types for the layout pipeline.
//!
//! This module defines the error types shared by every pipeline component: the
//! main [`LayoutError`] enum and the [`ProcessingStage`] enum used to tag where a
//! failure happened.

use std::path::PathBuf;

use thiserror::Error;

/// Enum representing different stages of processing in the layout pipeline.
///
/// Used to identify which stage an error occurred in, providing context for
/// debugging when a batch aborts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcessingStage {
    /// Resizing a source image to the training resolution.
    Resize,
    /// Rasterizing ground-truth annotations into masks.
    Rasterization,
    /// Reading or writing array blobs.
    Serialization,
    /// Running the worker pool over a batch of samples.
    BatchProcessing,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Resize => write!(f, "resize"),
            ProcessingStage::Rasterization => write!(f, "rasterization"),
            ProcessingStage::Serialization => write!(f, "serialization"),
            ProcessingStage::BatchProcessing => write!(f, "batch processing"),
        }
    }
}

/// Enum representing the errors that can occur in the layout pipeline.
///
/// Anything that surfaces as a `LayoutError` is fatal for the batch it happens
/// in. Expected noise (small contours, empty regions, columns without ink) is
/// filtered silently and never reaches this type.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// Error occurred while loading or encoding an image.
    #[error("image codec: {0}")]
    Image(#[from] image::ImageError),

    /// A sample has no ground-truth annotation while labels were requested.
    #[error("no ground-truth annotation for sample '{sample}' (expected {})", path.display())]
    MissingAnnotation {
        /// Identifier of the sample.
        sample: String,
        /// Where the annotation was expected.
        path: PathBuf,
    },

    /// Error raised while processing one sample of a batch.
    #[error("sample '{id}' ({}): {source}", path.display())]
    Sample {
        /// Identifier of the sample.
        id: String,
        /// Source image of the sample.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: Box<LayoutError>,
    },

    /// A ground-truth annotation exists but cannot be interpreted.
    #[error("malformed annotation {}: {message}", path.display())]
    Annotation {
        /// The offending annotation file.
        path: PathBuf,
        /// A message describing the problem.
        message: String,
    },

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// XML reader or writer error.
    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Error from array shape operations.
    #[error("array shape: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate.
pub type LayoutResult<T> = Result<T, LayoutError>;

impl From<ndarray_npy::WriteNpyError> for LayoutError {
    fn from(error: ndarray_npy::WriteNpyError) -> Self {
        Self::processing_error(ProcessingStage::Serialization, "writing npy blob", error)
    }
}

impl From<ndarray_npy::ReadNpyError> for LayoutError {
    fn from(error: ndarray_npy::ReadNpyError) -> Self {
        Self::processing_error(ProcessingStage::Serialization, "reading npy blob", error)
    }
}

impl From<quick_xml::events::attributes::AttrError> for LayoutError {
    fn from(error: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(quick_xml::Error::InvalidAttr(error))
    }
}

impl From<rayon::ThreadPoolBuildError> for LayoutError {
    fn from(error: rayon::ThreadPoolBuildError) -> Self {
        Self::processing_error(
            ProcessingStage::BatchProcessing,
            "building worker pool",
            error,
        )
    }
}

impl LayoutError {
    /// Wraps an underlying error with the stage it happened in.
    pub fn processing_error(
        kind: ProcessingStage,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a configuration error with enhanced context and details.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use htr_layout::core::LayoutError;
    /// let err = LayoutError::config_error_detailed(
    ///     "class map",
    ///     "codes must be distinct, 'paragraph' and 'note' share 64",
    /// );
    /// assert!(matches!(err, LayoutError::ConfigError { .. }));
    /// ```
    pub fn config_error_detailed(context: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ConfigError {
            message: format!("{}: {}", context.into(), details.into()),
        }
    }

    /// Creates a configuration error for invalid field values.
    ///
    /// # Arguments
    ///
    /// * `field` - The name of the field with an invalid value
    /// * `expected` - Description of what was expected
    /// * `actual` - Description of what was actually provided
    pub fn invalid_field(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ConfigError {
            message: format!(
                "invalid value for field '{}': expected {}, got {}",
                field.into(),
                expected.into(),
                actual.into()
            ),
        }
    }

    /// Attaches the sample an error happened in.
    ///
    /// Errors that already name their sample are returned unchanged.
    pub fn in_sample(self, id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        match self {
            Self::MissingAnnotation { .. } | Self::Sample { .. } => self,
            other => Self::Sample {
                id: id.into(),
                path: path.into(),
                source: Box::new(other),
            },
        }
    }

    /// Creates an annotation error for the given file.
    pub fn annotation(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Annotation {
            path: path.into(),
            message: message.into(),
        }
    }
}
