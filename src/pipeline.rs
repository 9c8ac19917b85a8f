use std::path::Path;

use image::{Rgb, RgbImage};

use crate::adapters::{TumorClassifier, TumorDetector, TumorSegmenter};
use crate::errors::Result;
use crate::image_io;
use crate::labels::Classification;
use crate::mask::BinaryMask;
use crate::model::{ModelRegistry, OnnxClassificationModel, OnnxDetectionModel, OnnxSegmentationModel};
use crate::overlay::{overlay_mask, OVERLAY_ALPHA, OVERLAY_COLOR};
use crate::preprocess::prepare_detection;

/// Detection probability at or above which the tumor branch runs.
///
/// The boundary is inclusive: exactly 0.5 counts as tumor present.
pub const TUMOR_THRESHOLD: f32 = 0.5;

/// Findings produced only when detection crosses the threshold.
#[derive(Debug, Clone)]
pub struct TumorFindings {
    pub classification: Classification,
    pub mask: BinaryMask,
}

/// Unified result of one pipeline invocation.
///
/// `findings` being `None` is the authoritative no-tumor marker; consumers
/// must never infer absence from zero-valued fields. When it is `None` the
/// overlay is a pixel-identical copy of the input image.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub detection_probability: f32,
    pub findings: Option<TumorFindings>,
    pub overlay: RgbImage,
}

impl PipelineResult {
    pub fn has_tumor(&self) -> bool {
        self.findings.is_some()
    }
}

/// The sequential triage pipeline.
///
/// Detection always runs; classification and segmentation run only when the
/// detection probability reaches [`TUMOR_THRESHOLD`] — below it they are not
/// invoked at all. That comparison is the single data-dependent branch in the
/// whole pipeline. Adapters are injected so tests run against stubs instead
/// of loaded sessions.
pub struct Pipeline<D, C, S> {
    detector: D,
    classifier: C,
    segmenter: S,
    overlay_color: Rgb<u8>,
    overlay_alpha: f32,
}

impl<D, C, S> Pipeline<D, C, S>
where
    D: TumorDetector,
    C: TumorClassifier,
    S: TumorSegmenter,
{
    pub fn new(detector: D, classifier: C, segmenter: S) -> Self {
        Self {
            detector,
            classifier,
            segmenter,
            overlay_color: OVERLAY_COLOR,
            overlay_alpha: OVERLAY_ALPHA,
        }
    }

    pub fn with_overlay_style(mut self, color: Rgb<u8>, alpha: f32) -> Self {
        self.overlay_color = color;
        self.overlay_alpha = alpha;
        self
    }

    /// Run the pipeline on an image file.
    pub fn run_on_path<P: AsRef<Path>>(&self, path: P) -> Result<PipelineResult> {
        let image = image_io::load_rgb(path)?;
        self.run_on_image(&image)
    }

    /// Run the pipeline on an already-decoded canonical RGB image.
    ///
    /// Any adapter failure aborts the invocation; there are no partial
    /// results.
    pub fn run_on_image(&self, image: &RgbImage) -> Result<PipelineResult> {
        let detection_probability = self
            .detector
            .predict_probability(prepare_detection(image).into())?;

        if detection_probability < TUMOR_THRESHOLD {
            return Ok(PipelineResult {
                detection_probability,
                findings: None,
                overlay: image.clone(),
            });
        }

        // The two branches are independent, both read only the canonical
        // image.
        let classification = self.classifier.classify(image)?;
        let mask = self.segmenter.segment(image)?;
        let overlay = overlay_mask(image, &mask, self.overlay_color, self.overlay_alpha)?;

        Ok(PipelineResult {
            detection_probability,
            findings: Some(TumorFindings {
                classification,
                mask,
            }),
            overlay,
        })
    }
}

impl Pipeline<OnnxDetectionModel, OnnxClassificationModel, OnnxSegmentationModel> {
    /// Assemble the production pipeline from a loaded model registry.
    pub fn from_registry(registry: ModelRegistry) -> Self {
        Self::new(registry.detector, registry.classifier, registry.segmenter)
    }
}
