//! Subcommand implementations.

use std::path::Path;
use std::time::Instant;

use htr_layout::core::{DatasetConfig, LayoutResult};
use htr_layout::dataset::{DatasetBuilder, PageGenerator, Sample, discover_samples};
use htr_layout::processors::PredictionMasks;
use ndarray::ArrayD;
use ndarray_npy::read_npy;
use rayon::prelude::*;
use tracing::{info, warn};

/// Builds the training set of every image in `input`.
pub fn run_build(input: &Path, config: DatasetConfig) -> LayoutResult<()> {
    let start = Instant::now();
    let samples = discover_samples(input, config.out_size)?;
    if samples.is_empty() {
        warn!("No images found in {}", input.display());
    }

    let manifests = DatasetBuilder::new(config)?.build(&samples)?;
    info!(
        "Processed {} samples in {:.2}s",
        manifests.artifacts.len(),
        start.elapsed().as_secs_f64()
    );
    info!("Image list: {}", manifests.images.display());
    if let (Some(labels), Some(weights)) = (&manifests.labels, &manifests.weights) {
        info!("Label list: {}", labels.display());
        info!("Weight list: {}", weights.display());
    }
    Ok(())
}

/// Writes a PAGE file for every image that has a prediction.
pub fn run_vectorize(
    images: &Path,
    predictions: &Path,
    config: &DatasetConfig,
    regions: &[String],
) -> LayoutResult<()> {
    let start = Instant::now();
    let mut generator = PageGenerator::new(config, &config.out_folder)?;
    if !regions.is_empty() {
        generator = generator.with_regions(regions)?;
    }

    let samples: Vec<Sample> = discover_samples(images, config.out_size)?
        .into_iter()
        .filter(|s| {
            let found = prediction_path(predictions, s).is_file();
            if !found {
                warn!("No prediction for {}, skipping", s.id);
            }
            found
        })
        .collect();

    let pool = config.parallel.build_pool()?;
    let written = pool.install(|| {
        samples
            .par_iter()
            .map(|sample| {
                let masks = load_prediction(predictions, sample)
                    .map_err(|e| e.in_sample(sample.id.as_str(), &sample.image_path))?;
                generator.generate(sample, &masks)
            })
            .collect::<LayoutResult<Vec<_>>>()
    })?;

    info!(
        "Wrote {} PAGE files in {:.2}s",
        written.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn load_prediction(predictions: &Path, sample: &Sample) -> LayoutResult<PredictionMasks> {
    let array: ArrayD<f32> = read_npy(prediction_path(predictions, sample))?;
    PredictionMasks::from_array(array)
}

fn prediction_path(predictions: &Path, sample: &Sample) -> std::path::PathBuf {
    predictions.join(format!("{}.npy", sample.id))
}
