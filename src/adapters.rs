use image::RgbImage;
use ndarray::prelude::*;

use crate::errors::{PipelineError, Result};
use crate::labels::Classification;
use crate::mask::BinaryMask;
use crate::preprocess::scale_to_unit;

/// Caller-supplied input for the detection adapter.
///
/// The detection model accepts a single grayscale plane, a channel-last
/// single-channel image, or an already-batched tensor. Modelling the three
/// accepted ranks as variants makes every other rank unrepresentable; the one
/// remaining invalid case (a channel-last tensor whose trailing dim is not 1)
/// is rejected in [`DetectionInput::into_batched`].
#[derive(Debug, Clone)]
pub enum DetectionInput {
    /// (H, W) grayscale plane.
    Plane(Array2<f32>),
    /// (H, W, 1) channel-last image.
    ChannelLast(Array3<f32>),
    /// (1, H, W, 1) batched NHWC tensor, e.g. from `prepare_detection`.
    Batched(Array4<f32>),
}

impl DetectionInput {
    /// Normalize any accepted variant into the (1, H, W, 1) NHWC batch the
    /// detection model runs on, applying the conditional unit-range scaling
    /// exactly once.
    pub fn into_batched(self) -> Result<Array4<f32>> {
        let batched = match self {
            Self::Plane(plane) => plane.insert_axis(Axis(2)).insert_axis(Axis(0)),
            Self::ChannelLast(tensor) => {
                let channels = tensor.shape()[2];
                if channels != 1 {
                    return Err(PipelineError::Shape {
                        expected: "(H, W, 1) channel-last grayscale".to_string(),
                        actual: format!("trailing dimension of {channels}"),
                    });
                }
                tensor.insert_axis(Axis(0))
            }
            Self::Batched(tensor) => tensor,
        };
        Ok(scale_to_unit(batched))
    }
}

impl From<Array2<f32>> for DetectionInput {
    fn from(plane: Array2<f32>) -> Self {
        Self::Plane(plane)
    }
}

impl From<Array3<f32>> for DetectionInput {
    fn from(tensor: Array3<f32>) -> Self {
        Self::ChannelLast(tensor)
    }
}

impl From<Array4<f32>> for DetectionInput {
    fn from(tensor: Array4<f32>) -> Self {
        Self::Batched(tensor)
    }
}

/// Binary presence-of-tumor inference.
pub trait TumorDetector: Send + Sync {
    /// Returns the sigmoid probability that a tumor is present, in [0, 1].
    fn predict_probability(&self, input: DetectionInput) -> Result<f32>;
}

/// Multi-class tumor-type inference.
///
/// Takes the canonical RGB image directly: the backend performs its own
/// grayscale conversion and scaling at the image's native resolution, not the
/// 224x224 compatibility tensor from `prepare_classification`.
pub trait TumorClassifier: Send + Sync {
    fn classify(&self, image: &RgbImage) -> Result<Classification>;
}

/// Per-pixel tumor-region inference.
///
/// Implementations must capture the image's dimensions before any resizing
/// and return the mask at exactly those dimensions, never at the model's
/// internal working resolution.
pub trait TumorSegmenter: Send + Sync {
    fn segment(&self, image: &RgbImage) -> Result<BinaryMask>;
}
