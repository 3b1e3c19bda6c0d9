//! Per-image dataset worker.
//!
//! [`process_sample`] is a pure function of a [`Sample`] and the shared
//! [`DatasetConfig`]: it writes the resized training image and, when labels are
//! requested, the rasterized label and weight blobs of that image.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array2, Axis};
use ndarray_npy::write_npy;

use crate::core::{DatasetConfig, LayoutError, LayoutResult, OutputSize, ProcessingStage};
use crate::domain::read_page;
use crate::processors::raster::{ImageprocRaster, gray_to_array};
use crate::utils::{is_image_file, load_image, resize_image};

/// Folder, next to the images, holding their PAGE annotations.
pub const ANNOTATION_DIR: &str = "page";

/// One input image of a dataset run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// File stem of the image, used to name every artifact.
    pub id: String,
    pub image_path: PathBuf,
    pub out_size: OutputSize,
}

impl Sample {
    /// Creates a sample named after the image's file stem.
    pub fn from_path(image_path: impl Into<PathBuf>, out_size: OutputSize) -> LayoutResult<Self> {
        let image_path = image_path.into();
        let id = image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                LayoutError::invalid_input(format!(
                    "cannot derive a sample id from {}",
                    image_path.display()
                ))
            })?
            .to_string();
        Ok(Self {
            id,
            image_path,
            out_size,
        })
    }

    /// Expected location of the ground-truth annotation: `<image dir>/page/{id}.xml`.
    pub fn annotation_path(&self) -> PathBuf {
        self.image_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(ANNOTATION_DIR)
            .join(format!("{}.xml", self.id))
    }
}

/// Lists the images of `dir` as samples, sorted by path.
pub fn discover_samples(dir: &Path, out_size: OutputSize) -> LayoutResult<Vec<Sample>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    tracing::debug!("found {} images in {}", paths.len(), dir.display());
    paths
        .into_iter()
        .map(|p| Sample::from_path(p, out_size))
        .collect()
}

/// Paths written for one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleArtifacts {
    pub image: PathBuf,
    pub label: Option<PathBuf>,
    pub weight: Option<PathBuf>,
}

/// Inverse-frequency class weights: every cell gets `1 / count(value)`.
pub fn inverse_frequency_weights(mask: &Array2<u8>) -> Array2<f32> {
    let mut counts = [0usize; 256];
    for &value in mask {
        counts[usize::from(value)] += 1;
    }
    mask.mapv(|value| 1.0 / counts[usize::from(value)] as f32)
}

/// Processes one sample: resized image, then optional label and weight blobs.
///
/// A missing annotation is fatal when labels are requested. Errors name the
/// sample they happened in.
pub fn process_sample(sample: &Sample, config: &DatasetConfig) -> LayoutResult<SampleArtifacts> {
    write_artifacts(sample, config)
        .map_err(|e| e.in_sample(sample.id.as_str(), &sample.image_path))
}

fn write_artifacts(sample: &Sample, config: &DatasetConfig) -> LayoutResult<SampleArtifacts> {
    let out_folder = &config.out_folder;
    let image = load_image(&sample.image_path)?;
    let resized = resize_image(&image, sample.out_size)?;
    let image_path = out_folder.join(format!("{}.png", sample.id));
    resized.save(&image_path)?;

    if !config.build_labels {
        return Ok(SampleArtifacts {
            image: image_path,
            label: None,
            weight: None,
        });
    }

    let annotation = sample.annotation_path();
    if !annotation.is_file() {
        tracing::error!(
            "no annotation for {} at {}",
            sample.image_path.display(),
            annotation.display()
        );
        return Err(LayoutError::MissingAnnotation {
            sample: sample.id.clone(),
            path: annotation,
        });
    }
    let page = read_page(&annotation)?;

    let raster = ImageprocRaster;
    let lines = gray_to_array(&page.baseline_mask(
        sample.out_size,
        config.line_color,
        config.line_width,
        &raster,
    )?);

    let label_path = out_folder.join(format!("{}.pickle", sample.id));
    let weight_path = out_folder.join(format!("{}_w.pickle", sample.id));
    if config.only_lines {
        let weights = inverse_frequency_weights(&lines);
        write_npy(&label_path, &lines)?;
        write_npy(&weight_path, &weights)?;
    } else {
        let regions =
            gray_to_array(&page.region_mask(sample.out_size, &config.classes, &raster)?);
        let stacking = |e: ndarray::ShapeError| {
            LayoutError::processing_error(
                ProcessingStage::Rasterization,
                "stacking label channels",
                e,
            )
        };
        let weights = ndarray::stack(
            Axis(0),
            &[
                inverse_frequency_weights(&lines).view(),
                inverse_frequency_weights(&regions).view(),
            ],
        )
        .map_err(stacking)?;
        let label =
            ndarray::stack(Axis(0), &[lines.view(), regions.view()]).map_err(stacking)?;
        write_npy(&label_path, &label)?;
        write_npy(&weight_path, &weights)?;
    }
    tracing::debug!("processed sample {}", sample.id);

    Ok(SampleArtifacts {
        image: image_path,
        label: Some(label_path),
        weight: Some(weight_path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ClassMap;
    use crate::domain::{Baseline, LinePolygon, Page, RegionPolygon, write_page};
    use crate::processors::{Point, Polygon};
    use image::{Rgb, RgbImage};
    use ndarray::{Array3, array};
    use ndarray_npy::read_npy;
    use std::collections::HashMap;

    fn write_image(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(200, 100, Rgb([230, 230, 230]))
            .save(&path)
            .unwrap();
        path
    }

    fn write_annotation(dir: &Path, id: &str) {
        let mut page = Page::new(format!("{id}.png"), 200, 100);
        page.regions.push(RegionPolygon {
            id: "r1".into(),
            class: "paragraph".into(),
            coords: Polygon::from_coords(10.0, 10.0, 190.0, 90.0),
            lines: vec![LinePolygon {
                id: "r1_l0".into(),
                coords: Polygon::from_coords(20.0, 30.0, 180.0, 50.0),
                baseline: Baseline::new(vec![Point::new(20.0, 50.0), Point::new(180.0, 50.0)]),
            }],
        });
        write_page(&page, &dir.join(ANNOTATION_DIR).join(format!("{id}.xml"))).unwrap();
    }

    fn config(out: &Path) -> DatasetConfig {
        DatasetConfig::new(
            OutputSize::new(50, 100),
            out,
            ClassMap::parse("paragraph=64,marginalia=192").unwrap(),
        )
        .with_line(3, 128)
    }

    #[test]
    fn test_inverse_frequency_weights() {
        let mask = array![[0u8, 0, 128], [0, 64, 128]];
        let weights = inverse_frequency_weights(&mask);

        let mut seen: HashMap<u8, f32> = HashMap::new();
        for (value, weight) in mask.iter().zip(weights.iter()) {
            let count = mask.iter().filter(|v| *v == value).count();
            assert_eq!(*weight, 1.0 / count as f32);
            let first = *seen.entry(*value).or_insert(*weight);
            assert_eq!(first, *weight);
        }
        assert_eq!(weights[[0, 0]], 1.0 / 3.0);
        assert_eq!(weights[[1, 1]], 1.0);
    }

    #[test]
    fn test_sample_ids_and_discovery() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "b.png");
        write_image(dir.path(), "a.jpg");
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join(ANNOTATION_DIR)).unwrap();

        let samples = discover_samples(dir.path(), OutputSize::new(10, 10)).unwrap();
        let ids: Vec<&str> = samples.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(
            samples[1].annotation_path(),
            dir.path().join("page").join("b.xml")
        );
    }

    #[test]
    fn test_process_sample_writes_stacked_labels() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let image = write_image(input.path(), "s1.png");
        write_annotation(input.path(), "s1");

        let config = config(output.path());
        let sample = Sample::from_path(image, config.out_size).unwrap();
        let artifacts = process_sample(&sample, &config).unwrap();

        assert_eq!(artifacts.image, output.path().join("s1.png"));
        assert_eq!(
            load_image(&artifacts.image).unwrap().dimensions(),
            (100, 50)
        );

        let label: Array3<u8> = read_npy(artifacts.label.unwrap()).unwrap();
        let weight: Array3<f32> = read_npy(artifacts.weight.unwrap()).unwrap();
        assert_eq!(label.dim(), (2, 50, 100));
        assert_eq!(weight.dim(), (2, 50, 100));
        // Baseline at y=50 of 100 lands on row 25
        assert_eq!(label[[0, 25, 50]], 128);
        assert_eq!(label[[1, 25, 50]], 64);
        assert_eq!(label[[1, 1, 1]], 0);
    }

    #[test]
    fn test_process_sample_lines_only() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let image = write_image(input.path(), "s2.png");
        write_annotation(input.path(), "s2");

        let config = config(output.path()).with_only_lines(true);
        let sample = Sample::from_path(image, config.out_size).unwrap();
        let artifacts = process_sample(&sample, &config).unwrap();

        let label: Array2<u8> = read_npy(artifacts.label.unwrap()).unwrap();
        let weight: Array2<f32> = read_npy(artifacts.weight.unwrap()).unwrap();
        assert_eq!(label.dim(), (50, 100));
        assert_eq!(weight, inverse_frequency_weights(&label));
    }

    #[test]
    fn test_missing_annotation_is_fatal() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let image = write_image(input.path(), "orphan.png");
        let config = config(output.path());
        let sample = Sample::from_path(image, config.out_size).unwrap();

        let err = process_sample(&sample, &config).unwrap_err();
        assert!(matches!(err, LayoutError::MissingAnnotation { ref sample, .. } if sample == "orphan"));

        // Without labels the annotation is never looked up
        let artifacts = process_sample(&sample, &config.with_build_labels(false)).unwrap();
        assert!(artifacts.label.is_none());
        assert!(artifacts.weight.is_none());
    }

    #[test]
    fn test_unreadable_annotation_names_sample() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let image = write_image(input.path(), "bad_xml.png");
        let page_dir = input.path().join(ANNOTATION_DIR);
        fs::create_dir(&page_dir).unwrap();
        fs::write(
            page_dir.join("bad_xml.xml"),
            r#"<PcGts><Page imageFilename="x"/></PcGts>"#,
        )
        .unwrap();

        let config = config(output.path());
        let sample = Sample::from_path(&image, config.out_size).unwrap();
        let err = process_sample(&sample, &config).unwrap_err();
        assert!(matches!(err, LayoutError::Sample { ref id, .. } if id == "bad_xml"));
        assert!(err.to_string().contains(&image.display().to_string()));
    }
}
