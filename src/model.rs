use std::path::Path;

use crate::{
    errors::{DetectError, Result},
    traits::ObjectDetectionModel,
};
use ndarray::prelude::*;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::Session,
    value::TensorRef,
};
use parking_lot::Mutex;
use tracing::{debug, info};

/// Hyperparameters the SSD512 VOC07+12 network was built with.
///
/// Anchor generation, decoding and NMS happen inside the exported graph.
/// These values describe that graph and are logged at startup; only the
/// input size is used on this side of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SsdSettings {
    /// `(width, height)` of the network input.
    pub image_size: (u32, u32),
    /// Object classes, not counting background.
    pub n_classes: usize,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub top_k: usize,
    pub nms_max_output_size: usize,
    pub scales: [f32; 8],
    pub steps: [u32; 7],
    pub offsets: [f32; 7],
    pub variances: [f32; 4],
    pub subtract_mean: [f32; 3],
    pub swap_channels: [usize; 3],
}

impl SsdSettings {
    pub const fn ssd512_voc() -> Self {
        Self {
            image_size: (512, 512),
            n_classes: 20,
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
            top_k: 200,
            nms_max_output_size: 400,
            scales: [0.07, 0.15, 0.3, 0.45, 0.6, 0.75, 0.9, 1.05],
            steps: [8, 16, 32, 64, 128, 256, 512],
            offsets: [0.5; 7],
            variances: [0.1, 0.1, 0.2, 0.2],
            subtract_mean: [123.0, 117.0, 104.0],
            swap_channels: [2, 1, 0],
        }
    }

    pub fn log(&self) {
        info!(
            "SSD input {}x{}, {} classes",
            self.image_size.0, self.image_size.1, self.n_classes
        );
        info!(
            "in-graph decoding: confidence {}, IoU {}, top-k {}, NMS max output {}",
            self.confidence_threshold, self.iou_threshold, self.top_k, self.nms_max_output_size
        );
        debug!(
            "scales {:?}, steps {:?}, offsets {:?}, variances {:?}, mean {:?}, channel swap {:?}",
            self.scales,
            self.steps,
            self.offsets,
            self.variances,
            self.subtract_mean,
            self.swap_channels
        );
    }
}

impl Default for SsdSettings {
    fn default() -> Self {
        Self::ssd512_voc()
    }
}

/// SSD network exported to ONNX, run through ONNX Runtime.
pub struct SsdModel {
    settings: SsdSettings,
    input_name: String,
    output_name: String,
    session: Mutex<Session>,
}

impl SsdModel {
    /// Loads the weights and runs one warm-up pass, so a weights file that
    /// does not fit the declared input fails here rather than on the first image.
    pub fn new(weights_path: &Path, device_id: Option<i32>, settings: SsdSettings) -> Result<Self> {
        if !weights_path.is_file() {
            return Err(DetectError::FileSystem {
                path: weights_path.to_path_buf(),
                operation: "open weights".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "weights file does not exist",
                ),
            });
        }

        let session = build_session(weights_path, device_id).map_err(|e| {
            DetectError::model(format!("load weights: {}", weights_path.display()), e)
        })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| DetectError::Validation {
                field: "model inputs".to_string(),
                reason: "are empty".to_string(),
            })?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| DetectError::Validation {
                field: "model outputs".to_string(),
                reason: "are empty".to_string(),
            })?;
        debug!("model input `{input_name}`, output `{output_name}`");

        let model = Self {
            settings,
            input_name,
            output_name,
            session: Mutex::new(session),
        };

        // initialize model
        let (width, height) = model.settings.image_size;
        let data = Array4::<f32>::zeros((1, height as usize, width as usize, 3));
        let warmup = model.predict(data.view()).map_err(|e| {
            DetectError::model(
                format!("warm-up inference ({}x{}x3 input)", width, height),
                e,
            )
        })?;
        debug!("warm-up output shape {:?}", warmup.shape());

        Ok(model)
    }

    pub const fn settings(&self) -> &SsdSettings {
        &self.settings
    }
}

fn build_session(weights_path: &Path, device_id: Option<i32>) -> ort::Result<Session> {
    let mut builder = Session::builder()?.with_memory_pattern(true)?;
    if let Some(device_id) = device_id {
        builder = builder.with_execution_providers([
            TensorRTExecutionProvider::default()
                .with_device_id(device_id)
                .build(),
            CUDAExecutionProvider::default()
                .with_device_id(device_id)
                .build(),
        ])?;
    }
    builder.commit_from_file(weights_path)
}

impl ObjectDetectionModel for SsdModel {
    fn input_size(&self) -> (u32, u32) {
        self.settings.image_size
    }

    fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array3<f32>> {
        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(&tensor.as_standard_layout())?
        ])?;
        Ok(outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix3>()?
            .to_owned())
    }
}
