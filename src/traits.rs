use crate::errors::Result;
use ndarray::prelude::*;

/// Object detection network behind a fixed-size input.
///
/// The batch detector depends on this trait rather than on the ONNX session,
/// so tests can substitute a model that returns fixture predictions.
pub trait ObjectDetectionModel: Send + Sync {
    /// Network input resolution as `(width, height)`.
    fn input_size(&self) -> (u32, u32);

    /// Runs one forward pass.
    ///
    /// `tensor` is laid out `[batch, height, width, 3]`. The result is indexed
    /// `[batch, detection, field]` where field 0 is the class id, field 1 the
    /// confidence and the last four fields the box `x0, y0, x1, y1` in
    /// model-input pixels.
    fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array3<f32>>;
}
