//! Shared configuration for dataset building and page generation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{ClassMap, ParallelPolicy};
use crate::core::{LayoutError, LayoutResult};
use crate::processors::BaselineConfig;

/// Half-width of the synthetic full-page class band in lines-only mode.
pub const LINES_ONLY_HALF_WIDTH: f32 = 64.0;

/// Training resolution, in rows by columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSize {
    pub rows: u32,
    pub cols: u32,
}

impl OutputSize {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    /// Array shape `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows as usize, self.cols as usize)
    }
}

/// Immutable configuration handed to every sample task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Target resolution of images and labels.
    pub out_size: OutputSize,
    /// Folder receiving images, blobs, manifests and generated pages.
    pub out_folder: PathBuf,
    /// Ordered region classes.
    #[serde(default)]
    pub classes: ClassMap,
    /// Explicit region band half-width; derived from `classes` when absent.
    #[serde(default)]
    pub region_band: Option<f32>,
    /// Stroke width of rasterized baselines, in output pixels.
    #[serde(default = "DatasetConfig::default_line_width")]
    pub line_width: u32,
    /// Intensity code of rasterized baselines.
    #[serde(default = "DatasetConfig::default_line_color")]
    pub line_color: u8,
    #[serde(default)]
    pub parallel: ParallelPolicy,
    #[serde(default)]
    pub baseline: BaselineConfig,
    /// Whether label and weight blobs are produced.
    #[serde(default = "DatasetConfig::default_true")]
    pub build_labels: bool,
    /// Process text lines only, without region classes.
    #[serde(default)]
    pub only_lines: bool,
}

impl DatasetConfig {
    /// Creates a configuration with default line, pool and baseline settings.
    pub fn new(out_size: OutputSize, out_folder: impl Into<PathBuf>, classes: ClassMap) -> Self {
        Self {
            out_size,
            out_folder: out_folder.into(),
            classes,
            region_band: None,
            line_width: Self::default_line_width(),
            line_color: Self::default_line_color(),
            parallel: ParallelPolicy::default(),
            baseline: BaselineConfig::default(),
            build_labels: true,
            only_lines: false,
        }
    }

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> LayoutResult<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            LayoutError::config_error_detailed(format!("parsing {}", path.display()), e.to_string())
        })
    }

    pub fn with_line(mut self, width: u32, color: u8) -> Self {
        self.line_width = width;
        self.line_color = color;
        self
    }

    pub fn with_parallel(mut self, parallel: ParallelPolicy) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_baseline(mut self, baseline: BaselineConfig) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn with_build_labels(mut self, build_labels: bool) -> Self {
        self.build_labels = build_labels;
        self
    }

    pub fn with_only_lines(mut self, only_lines: bool) -> Self {
        self.only_lines = only_lines;
        self
    }

    pub fn with_region_band(mut self, half_width: Option<f32>) -> Self {
        self.region_band = half_width;
        self
    }

    /// Half-width of the code band used to classify predicted region pixels.
    pub fn region_half_width(&self) -> LayoutResult<f32> {
        if self.only_lines {
            return Ok(LINES_ONLY_HALF_WIDTH);
        }
        self.region_band
            .or_else(|| self.classes.half_width())
            .ok_or_else(|| {
                LayoutError::config_error_detailed(
                    "class map",
                    "cannot derive a region band from fewer than 2 classes",
                )
            })
    }

    /// Minimum enclosed area of a region or line contour, in output pixels.
    pub fn min_area(&self) -> f32 {
        0.1 * self.out_size.rows as f32
    }

    /// Checks every field; called once before any work is scheduled.
    pub fn validate(&self) -> LayoutResult<()> {
        if self.out_size.rows == 0 || self.out_size.cols == 0 {
            return Err(LayoutError::invalid_field(
                "out_size",
                "non-zero rows and cols",
                format!("{}x{}", self.out_size.rows, self.out_size.cols),
            ));
        }
        if self.line_width == 0 {
            return Err(LayoutError::invalid_field("line_width", ">= 1", "0"));
        }
        if !(1..100).contains(&self.baseline.num_segments) {
            return Err(LayoutError::invalid_field(
                "num_segments",
                "1..100",
                self.baseline.num_segments.to_string(),
            ));
        }
        if self.parallel.processes == 0 {
            return Err(LayoutError::invalid_field("processes", ">= 1", "0"));
        }
        if let Some(band) = self.region_band
            && !(band.is_finite() && band > 0.0)
        {
            return Err(LayoutError::invalid_field(
                "region_band",
                "a positive number",
                band.to_string(),
            ));
        }
        self.classes.validate(self.only_lines)?;
        Ok(())
    }

    fn default_line_width() -> u32 {
        10
    }

    fn default_line_color() -> u8 {
        128
    }

    fn default_true() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::ApproxMode;

    fn config() -> DatasetConfig {
        DatasetConfig::new(
            OutputSize::new(100, 200),
            "/tmp/out",
            ClassMap::parse("paragraph=64,marginalia=192").unwrap(),
        )
    }

    #[test]
    fn test_defaults_follow_builder() {
        let config = config();
        assert_eq!(config.line_width, 10);
        assert_eq!(config.line_color, 128);
        assert_eq!(config.parallel.processes, 2);
        assert_eq!(config.baseline.num_segments, 4);
        assert!(config.build_labels);
        assert!(config.validate().is_ok());
        assert_eq!(config.min_area(), 10.0);
    }

    #[test]
    fn test_region_half_width() {
        assert_eq!(config().region_half_width().unwrap(), 64.0);
        assert_eq!(
            config()
                .with_region_band(Some(20.0))
                .region_half_width()
                .unwrap(),
            20.0
        );
        let lines_only = DatasetConfig::new(OutputSize::new(10, 10), "/tmp", ClassMap::default())
            .with_only_lines(true);
        assert_eq!(lines_only.region_half_width().unwrap(), LINES_ONLY_HALF_WIDTH);
        assert!(lines_only.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(
            config()
                .with_baseline(BaselineConfig::new(ApproxMode::Optimal, 0))
                .validate()
                .is_err()
        );
        assert!(
            config()
                .with_baseline(BaselineConfig::new(ApproxMode::Optimal, 100))
                .validate()
                .is_err()
        );
        assert!(config().with_line(0, 128).validate().is_err());
        assert!(config().with_region_band(Some(-1.0)).validate().is_err());

        let mut bad = config();
        bad.out_size = OutputSize::new(0, 10);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{
            "out_size": {"rows": 1024, "cols": 768},
            "out_folder": "/data/train",
            "classes": [{"name": "paragraph", "code": 64}, {"name": "marginalia", "code": 192}],
            "baseline": {"mode": "trace", "num_segments": 8}
        }"#;
        let config: DatasetConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.out_size, OutputSize::new(1024, 768));
        assert_eq!(config.classes.len(), 2);
        assert_eq!(config.baseline.mode, ApproxMode::Trace);
        assert_eq!(config.line_width, 10);
        assert!(config.build_labels);
        assert!(!config.only_lines);
    }
}
