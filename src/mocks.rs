use image::RgbImage;

use crate::adapters::{DetectionInput, TumorClassifier, TumorDetector, TumorSegmenter};
use crate::errors::{PipelineError, Result};
use crate::labels::Classification;
use crate::mask::BinaryMask;
use crate::preprocess::SEGMENTATION_SIZE;

/// Detector stub returning a fixed probability.
///
/// Still runs the input through rank normalization so contract violations
/// surface in tests exactly as they would against the real backend.
#[derive(Debug, Clone)]
pub struct MockDetector {
    pub probability: f32,
}

impl MockDetector {
    pub const fn new(probability: f32) -> Self {
        Self { probability }
    }
}

impl TumorDetector for MockDetector {
    fn predict_probability(&self, input: DetectionInput) -> Result<f32> {
        input.into_batched()?;
        Ok(self.probability)
    }
}

/// Classifier stub returning a fixed distribution.
#[derive(Debug, Clone)]
pub struct MockClassifier {
    pub probabilities: [f32; 3],
}

impl MockClassifier {
    pub const fn new(probabilities: [f32; 3]) -> Self {
        Self { probabilities }
    }
}

impl TumorClassifier for MockClassifier {
    fn classify(&self, _image: &RgbImage) -> Result<Classification> {
        Ok(Classification::from_probabilities(self.probabilities))
    }
}

/// Classifier stub that always fails, for error-propagation tests.
#[derive(Debug, Clone, Copy)]
pub struct FailingClassifier;

impl TumorClassifier for FailingClassifier {
    fn classify(&self, _image: &RgbImage) -> Result<Classification> {
        Err(PipelineError::Model {
            operation: "mock classification".to_string(),
            source: "forced failure".into(),
        })
    }
}

/// Segmenter stub emitting an all-one mask at the working resolution, then
/// resizing back to the input dimensions like the real adapter does.
#[derive(Debug, Clone)]
pub struct MockSegmenter {
    pub working_size: u32,
}

impl MockSegmenter {
    pub const fn new(working_size: u32) -> Self {
        Self { working_size }
    }
}

impl Default for MockSegmenter {
    fn default() -> Self {
        Self::new(SEGMENTATION_SIZE)
    }
}

impl TumorSegmenter for MockSegmenter {
    fn segment(&self, image: &RgbImage) -> Result<BinaryMask> {
        let (width, height) = image.dimensions();
        Ok(BinaryMask::filled(self.working_size, self.working_size).resize_nearest(width, height))
    }
}
