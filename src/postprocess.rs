//! Turns raw prediction tensors into render-ready annotations.

use ndarray::prelude::*;
use tracing::warn;

use crate::errors::{DetectError, Result};
use crate::labels::LabelSet;

/// Number of fields in one prediction row: class, confidence, x0, y0, x1, y1.
pub const PREDICTION_FIELDS: usize = 6;

/// Box corners `(x0, y0)` and `(x1, y1)` in pixels of some image space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Maps the box from an image of size `from` to an image of size `to`,
    /// both given as `(width, height)`.
    pub fn rescale(&self, from: (u32, u32), to: (u32, u32)) -> Self {
        let scale_x = to.0 as f32 / from.0 as f32;
        let scale_y = to.1 as f32 / from.1 as f32;
        Self {
            x0: self.x0 * scale_x,
            y0: self.y0 * scale_y,
            x1: self.x1 * scale_x,
            y1: self.y1 * scale_y,
        }
    }

    pub fn is_finite(&self) -> bool {
        [self.x0, self.y0, self.x1, self.y1]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Corners rounded to the nearest pixel.
    pub fn to_pixels(&self) -> ((i32, i32), (i32, i32)) {
        (
            (self.x0.round() as i32, self.y0.round() as i32),
            (self.x1.round() as i32, self.y1.round() as i32),
        )
    }
}

/// One detection as reported by the network, box in model-input pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    fn from_row(row: ArrayView1<f32>) -> Result<Self> {
        let n = row.len();
        let class = row[0];
        if !class.is_finite() || class < 0.0 {
            return Err(DetectError::Validation {
                field: "class id".to_string(),
                reason: format!("{class} is not a class index"),
            });
        }
        Ok(Self {
            class_id: class as usize,
            confidence: row[1],
            bbox: BoundingBox::new(row[n - 4], row[n - 3], row[n - 2], row[n - 1]),
        })
    }
}

/// A detection ready to be drawn on the original image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub top_left: (i32, i32),
    pub bottom_right: (i32, i32),
    pub label: String,
}

/// Keeps the rows of the first image in the batch whose confidence is
/// strictly greater than `threshold`, in the order the model returned them.
///
/// A kept row with a NaN or negative class id is a `Validation` error. Kept
/// rows whose box has a non-finite corner are dropped with a warning.
pub fn filter_detections(predictions: ArrayView3<f32>, threshold: f32) -> Result<Vec<Detection>> {
    let (batch, _, fields) = predictions.dim();
    if batch == 0 {
        return Err(DetectError::Validation {
            field: "predictions".to_string(),
            reason: "contain no batch entry".to_string(),
        });
    }
    if fields < PREDICTION_FIELDS {
        return Err(DetectError::Validation {
            field: "predictions".to_string(),
            reason: format!("have {fields} fields per row, expected at least {PREDICTION_FIELDS}"),
        });
    }

    let mut detections = Vec::new();
    for row in predictions
        .index_axis(Axis(0), 0)
        .outer_iter()
        .filter(|row| row[1] > threshold)
    {
        let detection = Detection::from_row(row)?;
        if !detection.bbox.is_finite() {
            warn!("skipping detection with non-finite box {:?}", detection.bbox);
            continue;
        }
        detections.push(detection);
    }
    Ok(detections)
}

/// Rescales detections from model space into an image of `original_size`
/// and attaches their label text.
///
/// Boxes are not clamped to the image; the drawing primitives clip.
pub fn annotate(
    detections: &[Detection],
    labels: &LabelSet,
    model_size: (u32, u32),
    original_size: (u32, u32),
) -> Vec<Annotation> {
    detections
        .iter()
        .map(|detection| {
            let (top_left, bottom_right) = detection
                .bbox
                .rescale(model_size, original_size)
                .to_pixels();
            Annotation {
                top_left,
                bottom_right,
                label: labels.label_text(detection.class_id, detection.confidence),
            }
        })
        .collect()
}
