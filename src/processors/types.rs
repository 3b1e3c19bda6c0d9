//! Types used in vectorization operations
//!
//! This module defines the enums that select between the different baseline
//! simplification strategies and their configuration.
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::LayoutError;

/// Specifies how the raw per-column baseline anchors are reduced to a polyline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApproxMode {
    /// Keep every anchor point
    #[default]
    #[serde(alias = "none")]
    Raw,
    /// Fit a fixed number of straight segments minimizing the vertical error
    Optimal,
    /// Resample the anchors to a fixed number of points along the trace
    Trace,
}

/// Implementation of FromStr trait for ApproxMode to parse the mode from a CLI string
impl FromStr for ApproxMode {
    type Err = LayoutError;

    /// Parses a string into an ApproxMode variant
    ///
    /// # Arguments
    /// * `mode` - One of "raw", "none", "optimal" or "trace" (case-insensitive)
    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode.to_ascii_lowercase().as_str() {
            "raw" | "none" => Ok(ApproxMode::Raw),
            "optimal" => Ok(ApproxMode::Optimal),
            "trace" => Ok(ApproxMode::Trace),
            other => Err(LayoutError::invalid_field(
                "approx_alg",
                "one of raw, optimal, trace",
                other,
            )),
        }
    }
}

impl std::fmt::Display for ApproxMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApproxMode::Raw => write!(f, "raw"),
            ApproxMode::Optimal => write!(f, "optimal"),
            ApproxMode::Trace => write!(f, "trace"),
        }
    }
}

/// Baseline simplification settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineConfig {
    /// Simplification strategy applied to the column anchors.
    #[serde(default)]
    pub mode: ApproxMode,
    /// Number of segments (`optimal`) or points (`trace`) of the simplified baseline.
    #[serde(default = "BaselineConfig::default_num_segments")]
    pub num_segments: usize,
}

impl BaselineConfig {
    /// Creates a new baseline configuration.
    pub fn new(mode: ApproxMode, num_segments: usize) -> Self {
        Self { mode, num_segments }
    }

    fn default_num_segments() -> usize {
        4
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            mode: ApproxMode::default(),
            num_segments: Self::default_num_segments(),
        }
    }
}
