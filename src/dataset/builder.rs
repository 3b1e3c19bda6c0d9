//! Parallel dataset build over a fixed-size worker pool.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use super::sample::{Sample, SampleArtifacts, process_sample};
use crate::core::{DatasetConfig, LayoutResult};

/// Manifest of resized images, one path per line.
pub const IMAGE_MANIFEST: &str = "img.lst";
/// Manifest of label blobs.
pub const LABEL_MANIFEST: &str = "label.lst";
/// Manifest of weight blobs.
pub const WEIGHT_MANIFEST: &str = "label_w.lst";

/// Manifest files written by a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifests {
    pub images: PathBuf,
    pub labels: Option<PathBuf>,
    pub weights: Option<PathBuf>,
    /// Per-sample artifacts, in input order.
    pub artifacts: Vec<SampleArtifacts>,
}

/// Runs the sample worker over every sample and writes the manifests.
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    config: DatasetConfig,
}

impl DatasetBuilder {
    /// Validates the configuration and creates a builder.
    pub fn new(config: DatasetConfig) -> LayoutResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// Processes every sample with [`process_sample`].
    pub fn build(&self, samples: &[Sample]) -> LayoutResult<Manifests> {
        self.run(samples, process_sample)
    }

    /// Processes every sample with `worker` on a dedicated pool.
    ///
    /// Row `i` of every manifest belongs to `samples[i]`. The first failing
    /// sample stops the run and no manifest is written.
    pub fn run<F>(&self, samples: &[Sample], worker: F) -> LayoutResult<Manifests>
    where
        F: Fn(&Sample, &DatasetConfig) -> LayoutResult<SampleArtifacts> + Sync,
    {
        let out_folder = &self.config.out_folder;
        if !out_folder.exists() {
            tracing::debug!("creating {}", out_folder.display());
            fs::create_dir_all(out_folder)?;
        }

        let pool = self.config.parallel.build_pool()?;
        tracing::info!(
            "processing {} samples on {} workers",
            samples.len(),
            pool.current_num_threads()
        );

        let config = &self.config;
        let artifacts = pool
            .install(|| {
                samples
                    .par_iter()
                    .map(|sample| {
                        worker(sample, config)
                            .map_err(|e| e.in_sample(sample.id.as_str(), &sample.image_path))
                    })
                    .collect::<LayoutResult<Vec<_>>>()
            })
            .inspect_err(|e| tracing::error!("dataset build aborted: {e}"))?;
        drop(pool);

        let images = out_folder.join(IMAGE_MANIFEST);
        write_manifest(&images, artifacts.iter().map(|a| Some(a.image.as_path())))?;

        let (labels, weights) = if config.build_labels {
            let labels = out_folder.join(LABEL_MANIFEST);
            let weights = out_folder.join(WEIGHT_MANIFEST);
            write_manifest(&labels, artifacts.iter().map(|a| a.label.as_deref()))?;
            write_manifest(&weights, artifacts.iter().map(|a| a.weight.as_deref()))?;
            (Some(labels), Some(weights))
        } else {
            (None, None)
        };

        tracing::info!("wrote manifests for {} samples", artifacts.len());
        Ok(Manifests {
            images,
            labels,
            weights,
            artifacts,
        })
    }
}

fn write_manifest<'a>(
    path: &Path,
    rows: impl Iterator<Item = Option<&'a Path>>,
) -> LayoutResult<()> {
    let mut content = String::new();
    for row in rows {
        if let Some(p) = row {
            content.push_str(&p.display().to_string());
        }
        content.push('\n');
    }
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ClassMap, LayoutError, OutputSize, ParallelPolicy};
    use image::{Rgb, RgbImage};
    use std::thread;
    use std::time::Duration;

    fn config(out: &Path) -> DatasetConfig {
        DatasetConfig::new(
            OutputSize::new(20, 40),
            out,
            ClassMap::parse("paragraph=64,marginalia=192").unwrap(),
        )
        .with_parallel(ParallelPolicy::new().with_processes(3))
    }

    fn samples(ids: &[&str]) -> Vec<Sample> {
        ids.iter()
            .map(|id| Sample {
                id: id.to_string(),
                image_path: PathBuf::from(format!("{id}.png")),
                out_size: OutputSize::new(20, 40),
            })
            .collect()
    }

    fn read_rows(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_manifest_rows_follow_input_order() {
        let out = tempfile::tempdir().unwrap();
        let builder = DatasetBuilder::new(config(out.path())).unwrap();
        let input = samples(&["A", "B", "C", "D"]);

        // Earlier samples finish last
        let manifests = builder
            .run(&input, |sample, _| {
                let delay = match sample.id.as_str() {
                    "A" => 120,
                    "B" => 80,
                    "C" => 40,
                    _ => 0,
                };
                thread::sleep(Duration::from_millis(delay));
                Ok(SampleArtifacts {
                    image: PathBuf::from(format!("{}.png", sample.id)),
                    label: Some(PathBuf::from(format!("{}.pickle", sample.id))),
                    weight: Some(PathBuf::from(format!("{}_w.pickle", sample.id))),
                })
            })
            .unwrap();

        assert_eq!(read_rows(&manifests.images), ["A.png", "B.png", "C.png", "D.png"]);
        assert_eq!(
            read_rows(manifests.labels.as_ref().unwrap()),
            ["A.pickle", "B.pickle", "C.pickle", "D.pickle"]
        );
        assert_eq!(
            read_rows(manifests.weights.as_ref().unwrap())[3],
            "D_w.pickle"
        );
    }

    #[test]
    fn test_failure_writes_no_manifest() {
        let out = tempfile::tempdir().unwrap();
        let builder = DatasetBuilder::new(config(out.path())).unwrap();
        let result = builder.run(&samples(&["A", "B", "C"]), |sample, _| {
            if sample.id == "B" {
                return Err(LayoutError::invalid_input("broken sample"));
            }
            Ok(SampleArtifacts {
                image: PathBuf::from(&sample.id),
                label: None,
                weight: None,
            })
        });

        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("sample 'B' (B.png)"));
        assert!(!out.path().join(IMAGE_MANIFEST).exists());
        assert!(!out.path().join(LABEL_MANIFEST).exists());
        assert!(!out.path().join(WEIGHT_MANIFEST).exists());
    }

    #[test]
    fn test_missing_annotation_aborts_build() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut batch = Vec::new();
        for id in ["p1", "p2"] {
            let path = input.path().join(format!("{id}.png"));
            RgbImage::from_pixel(40, 20, Rgb([200, 200, 200]))
                .save(&path)
                .unwrap();
            batch.push(Sample::from_path(path, OutputSize::new(20, 40)).unwrap());
        }

        let builder = DatasetBuilder::new(config(out.path())).unwrap();
        let err = builder.build(&batch).unwrap_err();
        assert!(matches!(err, LayoutError::MissingAnnotation { .. }));
        assert!(!out.path().join(IMAGE_MANIFEST).exists());
    }

    #[test]
    fn test_corrupt_image_error_names_sample() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let good = input.path().join("page_001.png");
        RgbImage::from_pixel(40, 20, Rgb([200, 200, 200]))
            .save(&good)
            .unwrap();
        let broken = input.path().join("page_042.png");
        fs::write(&broken, b"not a png at all").unwrap();
        let batch = vec![
            Sample::from_path(good, OutputSize::new(20, 40)).unwrap(),
            Sample::from_path(&broken, OutputSize::new(20, 40)).unwrap(),
        ];

        let builder = DatasetBuilder::new(config(out.path()).with_build_labels(false)).unwrap();
        let err = builder.build(&batch).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("page_042"), "{msg}");
        assert!(msg.contains(&broken.display().to_string()), "{msg}");
        assert!(!out.path().join(IMAGE_MANIFEST).exists());
    }

    #[test]
    fn test_build_without_labels() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let path = input.path().join("only.png");
        RgbImage::from_pixel(80, 40, Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();
        let batch = vec![Sample::from_path(path, OutputSize::new(20, 40)).unwrap()];

        let nested = out.path().join("nested");
        let builder =
            DatasetBuilder::new(config(&nested).with_build_labels(false)).unwrap();
        let manifests = builder.build(&batch).unwrap();

        assert!(manifests.labels.is_none());
        assert!(!nested.join(LABEL_MANIFEST).exists());
        let rows = read_rows(&manifests.images);
        assert_eq!(rows, [nested.join("only.png").display().to_string()]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let out = tempfile::tempdir().unwrap();
        let bad = config(out.path()).with_parallel(ParallelPolicy::new().with_processes(0));
        assert!(DatasetBuilder::new(bad).is_err());
    }
}
