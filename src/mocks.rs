use crate::errors::{DetectError, Result};
use crate::postprocess::PREDICTION_FIELDS;
use crate::traits::ObjectDetectionModel;
use ndarray::prelude::*;

/// Test model that returns the same fixture predictions for every image.
#[derive(Debug, Clone)]
pub struct MockDetectionModel {
    pub input_size: (u32, u32),
    predictions: Array3<f32>,
}

impl MockDetectionModel {
    /// A model that never detects anything.
    pub fn new(input_size: (u32, u32)) -> Self {
        Self {
            input_size,
            predictions: Array3::zeros((1, 0, PREDICTION_FIELDS)),
        }
    }

    /// A model that reports `rows` (`[class, confidence, x0, y0, x1, y1]`)
    /// for every image.
    pub fn with_detections(input_size: (u32, u32), rows: &[[f32; PREDICTION_FIELDS]]) -> Self {
        let predictions = Array2::from_shape_fn((rows.len(), PREDICTION_FIELDS), |(i, j)| {
            rows[i][j]
        })
        .insert_axis(Axis(0));
        Self {
            input_size,
            predictions,
        }
    }
}

impl ObjectDetectionModel for MockDetectionModel {
    fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array3<f32>> {
        let (width, height) = self.input_size;
        let expected = [1, height as usize, width as usize, 3];
        if tensor.shape() != &expected[..] {
            return Err(DetectError::Validation {
                field: "input tensor".to_string(),
                reason: format!("has shape {:?}, expected {:?}", tensor.shape(), expected),
            });
        }
        Ok(self.predictions.clone())
    }
}

/// Mock with the SSD512 input size and no detections.
pub fn create_mock_model() -> MockDetectionModel {
    MockDetectionModel::new((512, 512))
}
