//! PAGE generation from model predictions.

use std::path::PathBuf;

use crate::core::{ClassEntry, ClassMap, DatasetConfig, LayoutError, LayoutResult};
use crate::domain::write_page;
use crate::processors::{MaskVectorizer, PredictionMasks};
use crate::utils::{link_or_copy, load_image};

use super::sample::{ANNOTATION_DIR, Sample};

/// Writes `page/{id}.xml` for predicted masks, next to a link to the source image.
#[derive(Debug, Clone)]
pub struct PageGenerator {
    vectorizer: MaskVectorizer,
    classes: ClassMap,
    out_folder: PathBuf,
}

impl PageGenerator {
    /// Creates a generator extracting every class of `config`.
    pub fn new(config: &DatasetConfig, out_folder: impl Into<PathBuf>) -> LayoutResult<Self> {
        Ok(Self {
            vectorizer: MaskVectorizer::new(config)?,
            classes: config.classes.clone(),
            out_folder: out_folder.into(),
        })
    }

    /// Restricts extraction to the named classes, in the given order.
    pub fn with_regions<S: AsRef<str>>(mut self, names: &[S]) -> LayoutResult<Self> {
        self.classes = self.classes.select(names)?;
        Ok(self)
    }

    pub fn classes(&self) -> &[ClassEntry] {
        self.classes.entries()
    }

    /// Vectorizes one sample's prediction and writes its PAGE file.
    ///
    /// Returns the path of the written annotation. Errors name the sample.
    pub fn generate(&self, sample: &Sample, masks: &PredictionMasks) -> LayoutResult<PathBuf> {
        self.write_sample_page(sample, masks)
            .map_err(|e| e.in_sample(sample.id.as_str(), &sample.image_path))
    }

    fn write_sample_page(&self, sample: &Sample, masks: &PredictionMasks) -> LayoutResult<PathBuf> {
        tracing::debug!("generating page for {}", sample.id);
        let image_name = sample
            .image_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                LayoutError::invalid_input(format!(
                    "image path {} has no file name",
                    sample.image_path.display()
                ))
            })?;

        link_or_copy(&sample.image_path, &self.out_folder.join(image_name))?;
        let image = load_image(&sample.image_path)?;
        let page = self
            .vectorizer
            .vectorize_page(&image, image_name, masks, self.classes.entries())?;

        let path = self
            .out_folder
            .join(ANNOTATION_DIR)
            .join(format!("{}.xml", sample.id));
        write_page(&page, &path)?;
        tracing::debug!(
            "{}: {} regions, {} lines",
            sample.id,
            page.regions.len(),
            page.lines().count()
        );
        Ok(path)
    }
}
