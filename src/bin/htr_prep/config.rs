//! Dataset settings shared by every subcommand.

use std::path::{Path, PathBuf};

use clap::Args;
use htr_layout::core::{
    ClassMap, DatasetConfig, LayoutError, LayoutResult, OutputSize, ParallelPolicy,
};

/// Settings taken from an optional JSON file, then overridden by flags.
#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    /// JSON dataset configuration
    #[arg(long, env = "HTR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output rows
    #[arg(long)]
    pub rows: Option<u32>,

    /// Output columns
    #[arg(long)]
    pub cols: Option<u32>,

    /// Region classes as `name=code` pairs, e.g. `paragraph=64,marginalia=192`
    #[arg(long)]
    pub classes: Option<String>,

    /// Baseline stroke width in output pixels
    #[arg(long)]
    pub line_width: Option<u32>,

    /// Baseline intensity code
    #[arg(long)]
    pub line_color: Option<u8>,

    /// Worker threads
    #[arg(long, env = "HTR_PROCESSES")]
    pub processes: Option<usize>,

    /// Process text lines only
    #[arg(long)]
    pub only_lines: bool,
}

impl SettingsArgs {
    /// Builds the dataset configuration written to `output`.
    pub fn resolve(&self, output: &Path) -> LayoutResult<DatasetConfig> {
        let mut config = match &self.config {
            Some(path) => DatasetConfig::from_json_file(path)?,
            None => {
                let (Some(rows), Some(cols)) = (self.rows, self.cols) else {
                    return Err(LayoutError::config_error_detailed(
                        "output size",
                        "--rows and --cols are required without --config",
                    ));
                };
                DatasetConfig::new(OutputSize::new(rows, cols), output, ClassMap::default())
            }
        };
        config.out_folder = output.to_path_buf();

        if let Some(rows) = self.rows {
            config.out_size.rows = rows;
        }
        if let Some(cols) = self.cols {
            config.out_size.cols = cols;
        }
        if let Some(classes) = &self.classes {
            config.classes = ClassMap::parse(classes)?;
        }
        if let Some(width) = self.line_width {
            config.line_width = width;
        }
        if let Some(color) = self.line_color {
            config.line_color = color;
        }
        if let Some(processes) = self.processes {
            config.parallel = ParallelPolicy::new().with_processes(processes);
        }
        if self.only_lines {
            config.only_lines = true;
        }

        config.validate()?;
        Ok(config)
    }
}
