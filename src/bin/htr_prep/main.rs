//! htr-prep
//!
//! Command line front end for layout dataset preparation.
//!
//! # Usage
//!
//! ## Build a training set
//! ```bash
//! htr-prep build --input data/train --output work/train --rows 1024 --cols 768 \
//!     --classes paragraph=64,marginalia=192
//! ```
//!
//! ## Turn predictions into PAGE files
//! ```bash
//! htr-prep vectorize --images data/test --predictions work/pred --output work/page \
//!     --config work/train/config.json --approx optimal --num-segments 4
//! ```

mod cli;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use htr_layout::processors::ApproxMode;

#[derive(Parser)]
#[command(name = "htr-prep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Layout dataset preparation and PAGE generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resize images and rasterize their PAGE ground truth
    Build {
        /// Folder holding the images, with annotations under `page/`
        #[arg(long, env = "HTR_INPUT")]
        input: PathBuf,

        /// Folder receiving images, blobs and manifests
        #[arg(long, env = "HTR_OUTPUT")]
        output: PathBuf,

        #[command(flatten)]
        settings: config::SettingsArgs,

        /// Only write resized images, without labels
        #[arg(long)]
        no_labels: bool,
    },
    /// Vectorize predicted masks into PAGE files
    Vectorize {
        /// Folder holding the source images
        #[arg(long)]
        images: PathBuf,

        /// Folder holding one `{id}.npy` prediction per image
        #[arg(long)]
        predictions: PathBuf,

        /// Folder receiving image links and `page/{id}.xml`
        #[arg(long)]
        output: PathBuf,

        #[command(flatten)]
        settings: config::SettingsArgs,

        /// Baseline simplification (raw, optimal, trace)
        #[arg(long)]
        approx: Option<ApproxMode>,

        /// Segments (optimal) or points (trace) per baseline
        #[arg(long)]
        num_segments: Option<usize>,

        /// Region classes to extract, in order (defaults to all)
        #[arg(long, value_delimiter = ',')]
        regions: Vec<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    htr_layout::utils::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            settings,
            no_labels,
        } => {
            let config = settings.resolve(&output)?.with_build_labels(!no_labels);
            info!("Building dataset from {}", input.display());
            cli::run_build(&input, config)?;
        }
        Commands::Vectorize {
            images,
            predictions,
            output,
            settings,
            approx,
            num_segments,
            regions,
        } => {
            let mut config = settings.resolve(&output)?;
            if let Some(mode) = approx {
                config.baseline.mode = mode;
            }
            if let Some(k) = num_segments {
                config.baseline.num_segments = k;
            }
            config.validate()?;
            info!("Vectorizing predictions from {}", predictions.display());
            cli::run_vectorize(&images, &predictions, &config, &regions)?;
        }
    }

    Ok(())
}
