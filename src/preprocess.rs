use std::path::Path;

use image::{imageops, imageops::FilterType, DynamicImage, ImageReader};
use ndarray::prelude::*;
use nshare::AsNdarray3;

use crate::errors::{DetectError, Result};

/// Decodes an image file at its native resolution.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let reader = ImageReader::open(path).map_err(|e| DetectError::FileSystem {
        path: path.to_path_buf(),
        operation: "open image".to_string(),
        source: e,
    })?;
    let reader = reader
        .with_guessed_format()
        .map_err(|e| DetectError::FileSystem {
            path: path.to_path_buf(),
            operation: "guess image format".to_string(),
            source: e,
        })?;

    reader
        .decode()
        .map_err(|e| DetectError::image(path.display().to_string(), "decode image", e))
}

/// Resizes `image` to the model input and lays it out as `[1, height, width, 3]`.
///
/// Aspect ratio is not kept. Values stay in `0..=255`; mean subtraction and
/// the RGB to BGR swap happen inside the network graph.
pub fn preprocess(image: &DynamicImage, (width, height): (u32, u32)) -> Array4<f32> {
    let resized = imageops::resize(&image.to_rgb8(), width, height, FilterType::Nearest);

    // CHW view -> HWC -> NHWC
    resized
        .as_ndarray3()
        .permuted_axes([1, 2, 0])
        .mapv(f32::from)
        .insert_axis(Axis(0))
}
