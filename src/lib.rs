pub mod config;
pub mod errors;
pub mod labels;
pub mod model;
pub mod postprocess;
pub mod preprocess;
pub mod render;
pub mod traits;

pub mod mocks;

use image::DynamicImage;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub use config::Config;
pub use errors::{DetectError, Result};
pub use labels::LabelSet;
pub use model::{SsdModel, SsdSettings};
pub use postprocess::{Annotation, BoundingBox, Detection};
pub use render::{DrawStyle, Renderer};
pub use traits::*;

#[cfg(test)]
pub use mocks::*;

/// Totals for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub images: usize,
    pub detections: usize,
}

/// Runs detection over every image in a directory, one file at a time.
///
/// The first failure aborts the whole run; nothing is skipped or retried.
pub struct BatchDetector<M: ObjectDetectionModel> {
    model: M,
    renderer: Renderer,
    labels: LabelSet,
    config: Config,
}

impl<M: ObjectDetectionModel> BatchDetector<M> {
    pub const fn new(model: M, renderer: Renderer, config: Config) -> Self {
        Self {
            model,
            renderer,
            labels: LabelSet::voc(),
            config,
        }
    }

    pub fn with_labels(mut self, labels: LabelSet) -> Self {
        self.labels = labels;
        self
    }

    pub fn process_directory(&self) -> Result<BatchSummary> {
        let input_path = &self.config.input_dir;

        if !input_path.is_dir() {
            return Err(DetectError::FileSystem {
                path: input_path.clone(),
                operation: "check input directory".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "input directory does not exist",
                ),
            });
        }

        let input_files = self.collect_input_files(input_path)?;

        let mut summary = BatchSummary::default();
        if input_files.is_empty() {
            info!("no files found in {}", input_path.display());
            return Ok(summary);
        }

        let pb = ProgressBar::new(input_files.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .map_err(|e| DetectError::Configuration {
                message: format!("progress bar template: {e}"),
            })?
            .progress_chars("#>-"),
        );

        for input_file in &input_files {
            pb.suspend(|| info!("Reading {}", display_name(input_file)));
            let annotations = self.process_single_image(input_file)?;
            summary.images += 1;
            summary.detections += annotations.len();
            pb.inc(1);
        }

        pb.finish_and_clear();
        info!(
            "processed {} images, {} detections drawn",
            summary.images, summary.detections
        );
        Ok(summary)
    }

    /// Regular files directly inside `input_path`, sorted by file name.
    fn collect_input_files(&self, input_path: &Path) -> Result<Vec<PathBuf>> {
        let mut input_files = Vec::new();

        for entry in WalkDir::new(input_path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| DetectError::FileSystem {
                path: input_path.to_path_buf(),
                operation: "list input directory".to_string(),
                source: e.into(),
            })?;
            if entry.path().is_file() {
                input_files.push(entry.into_path());
            }
        }

        Ok(input_files)
    }

    /// Annotates one file and writes it under the same name into the output
    /// directory. Returns what was drawn.
    pub fn process_single_image(&self, input_file: &Path) -> Result<Vec<Annotation>> {
        let image = preprocess::load_image(input_file)?;
        let (annotated, annotations) = self.detect_objects(image)?;

        let output_file = self.output_path(input_file)?;
        annotated.save(&output_file).map_err(|e| {
            DetectError::image(output_file.display().to_string(), "save annotated image", e)
        })?;

        Ok(annotations)
    }

    /// Detections above the confidence threshold, boxes in model-input pixels.
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let tensor = preprocess::preprocess(image, self.model.input_size());
        let predictions = self.model.predict(tensor.view())?;
        postprocess::filter_detections(predictions.view(), self.config.confidence)
    }

    /// Draws the detections onto `image` at its original resolution, keeping
    /// its color type and bit depth.
    pub fn detect_objects(
        &self,
        mut image: DynamicImage,
    ) -> Result<(DynamicImage, Vec<Annotation>)> {
        let detections = self.detect(&image)?;
        let annotations = postprocess::annotate(
            &detections,
            &self.labels,
            self.model.input_size(),
            (image.width(), image.height()),
        );

        for annotation in &annotations {
            debug!(
                "{} at {:?}-{:?}",
                annotation.label, annotation.top_left, annotation.bottom_right
            );
        }
        self.renderer.draw(&mut image, &annotations);

        Ok((image, annotations))
    }

    pub fn output_path(&self, input_file: &Path) -> Result<PathBuf> {
        input_file
            .file_name()
            .map(|name| self.config.output_dir.join(name))
            .ok_or_else(|| DetectError::FileSystem {
                path: input_file.to_path_buf(),
                operation: "get file name".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "input path has no file name",
                ),
            })
    }
}

impl BatchDetector<SsdModel> {
    /// Loads the ONNX weights and the label font named by `config`, falling
    /// back to the built-in font.
    pub fn with_ssd_model(config: Config) -> Result<Self> {
        let model = SsdModel::new(&config.weights, config.device_id, SsdSettings::ssd512_voc())?;
        let renderer = match &config.font {
            Some(font) => Renderer::with_font_file(DrawStyle::default(), font)?,
            None => Renderer::with_embedded_font(DrawStyle::default())?,
        };
        Ok(Self::new(model, renderer, config))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}
