use std::path::PathBuf;
use thiserror::Error;

/// Boxed source error carried by the image and model variants.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Structured error types for the batch detector.
///
/// Each variant carries the context of its domain (filesystem, image codec,
/// inference session, prediction tensor) so callers never parse messages.
/// Nothing is retried: every variant aborts the batch run.
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: BoxedError,
    },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: BoxedError,
    },

    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, DetectError>;

impl DetectError {
    pub(crate) fn model(operation: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        Self::Model {
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub(crate) fn image(
        path: impl Into<String>,
        operation: impl Into<String>,
        source: impl Into<BoxedError>,
    ) -> Self {
        Self::ImageProcessing {
            path: path.into(),
            operation: operation.into(),
            source: source.into(),
        }
    }
}

/// Errors coming through anyhow carry no structure, so they land in the
/// configuration bucket.
impl From<anyhow::Error> for DetectError {
    fn from(err: anyhow::Error) -> Self {
        Self::Configuration {
            message: err.to_string(),
        }
    }
}

/// Fallback for I/O errors raised without a path. Callers that know the path
/// build `DetectError::FileSystem` themselves.
impl From<std::io::Error> for DetectError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<image::ImageError> for DetectError {
    fn from(err: image::ImageError) -> Self {
        Self::image("unknown", "image processing", err)
    }
}

impl From<ort::Error> for DetectError {
    fn from(err: ort::Error) -> Self {
        Self::model("ort operation", err)
    }
}

/// Shape errors only happen while reshaping inference tensors, so they are
/// reported as model errors.
impl From<ndarray::ShapeError> for DetectError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::model("tensor shape conversion", err)
    }
}
