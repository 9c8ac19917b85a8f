use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for the triage pipeline.
///
/// # Why structured errors
///
/// The calling layer needs to tell "the uploaded bytes were not an image" apart
/// from "a model blew up half way through a scan". Each variant captures the
/// context of its error domain so callers never have to parse error strings,
/// and the thiserror crate generates the Display implementations from format
/// strings.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Decode error: {context}")]
    Decode {
        context: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Shape error: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error(
        "Shape mismatch: image is {image_width}x{image_height} but mask is {mask_width}x{mask_height}"
    )]
    ShapeMismatch {
        image_width: u32,
        image_height: u32,
        mask_width: u32,
        mask_height: u32,
    },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Convert image crate errors to decode errors.
///
/// # Why decode, not a generic image error
///
/// Every place the image crate can fail on the library's paths is a decode of
/// untrusted input bytes; encode failures on output go through the CLI's
/// anyhow chain instead. Mapping the whole crate error to Decode keeps the
/// taxonomy aligned with what the caller can act on.
impl From<image::ImageError> for PipelineError {
    fn from(err: image::ImageError) -> Self {
        Self::Decode {
            context: "image decoding".to_string(),
            source: err,
        }
    }
}

/// Convert ONNX Runtime errors to model errors.
impl From<ort::Error> for PipelineError {
    fn from(err: ort::Error) -> Self {
        Self::Model {
            operation: "ort operation".to_string(),
            source: Box::new(err),
        }
    }
}

/// Convert ndarray shape errors to model errors.
///
/// # Why model error category
///
/// ndarray shape errors only surface while massaging tensors in and out of a
/// forward pass, so they are categorized as model errors rather than the
/// pipeline's own Shape contract violations, which are constructed explicitly.
impl From<ndarray::ShapeError> for PipelineError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Model {
            operation: "tensor shape conversion".to_string(),
            source: Box::new(err),
        }
    }
}

/// Convert I/O errors to filesystem errors.
///
/// Code that has context should construct PipelineError::FileSystem directly
/// with the specific path and operation; this is the fallback.
impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}
