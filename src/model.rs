use std::path::{Path, PathBuf};

use image::RgbImage;
use ndarray::prelude::*;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;

use crate::adapters::{DetectionInput, TumorClassifier, TumorDetector, TumorSegmenter};
use crate::errors::{PipelineError, Result};
use crate::labels::{Classification, TumorClass};
use crate::mask::BinaryMask;
use crate::preprocess::{
    prepare_segmentation, scale_to_unit, to_grayscale, DETECTION_SIZE, SEGMENTATION_SIZE,
};

/// Locations of the three model artifacts on disk.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub detection: PathBuf,
    pub classification: PathBuf,
    pub segmentation: PathBuf,
}

/// The three loaded ONNX backends, constructed once at process start.
///
/// Loading is all-or-nothing: if any artifact is missing or corrupt the
/// registry fails to construct and the process must not start serving. The
/// registry is the only place sessions are created; the pipeline receives it
/// by injection so tests can swap in mock adapters instead.
pub struct ModelRegistry {
    pub detector: OnnxDetectionModel,
    pub classifier: OnnxClassificationModel,
    pub segmenter: OnnxSegmentationModel,
}

impl ModelRegistry {
    pub fn load(paths: &ModelPaths, device_id: i32) -> Result<Self> {
        Ok(Self {
            detector: OnnxDetectionModel::load(&paths.detection, device_id)?,
            classifier: OnnxClassificationModel::load(&paths.classification, device_id)?,
            segmenter: OnnxSegmentationModel::load(&paths.segmentation, device_id)?,
        })
    }
}

fn model_error(operation: &str, source: impl std::error::Error + Send + Sync + 'static) -> PipelineError {
    PipelineError::Model {
        operation: operation.to_string(),
        source: Box::new(source),
    }
}

fn build_session(model_path: &Path, device_id: i32) -> Result<Session> {
    SessionBuilder::new()
        .map_err(|e| model_error("session builder init", e))?
        .with_execution_providers([
            TensorRTExecutionProvider::default()
                .with_device_id(device_id)
                .build(),
            CUDAExecutionProvider::default()
                .with_device_id(device_id)
                .build(),
        ])
        .map_err(|e| model_error("execution provider setup", e))?
        .with_memory_pattern(true)
        .map_err(|e| model_error("memory pattern setup", e))?
        .commit_from_file(model_path)
        .map_err(|e| model_error(&format!("loading model file {}", model_path.display()), e))
}

/// Run one forward pass through a session, returning the first output as a
/// dynamic-rank f32 array.
///
/// ort sessions are not documented as safe for concurrent forward passes, so
/// each backend serializes access through its own mutex.
fn forward(
    session: &Mutex<Session>,
    input_name: &str,
    output_name: &str,
    tensor: ArrayView4<'_, f32>,
) -> Result<ArrayD<f32>> {
    let mut session = session.lock();
    let outputs = session.run(
        ort::inputs![input_name => TensorRef::from_array_view(&tensor.as_standard_layout())?],
    )?;
    Ok(outputs[output_name].try_extract_array::<f32>()?.to_owned())
}

fn io_names(session: &Session) -> (String, String) {
    (
        session.inputs[0].name.clone(),
        session.outputs[0].name.clone(),
    )
}

/// ONNX backend for the tumor presence model (sigmoid head, NHWC input).
pub struct OnnxDetectionModel {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxDetectionModel {
    pub fn load(model_path: &Path, device_id: i32) -> Result<Self> {
        let session = build_session(model_path, device_id)?;
        let (input_name, output_name) = io_names(&session);
        let model = Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        };

        // Warm-up pass; also surfaces a broken artifact at startup instead of
        // on the first request.
        let size = DETECTION_SIZE as usize;
        let zeros = Array4::<f32>::zeros((1, size, size, 1));
        model.forward(zeros.view())?;
        Ok(model)
    }

    fn forward(&self, tensor: ArrayView4<'_, f32>) -> Result<ArrayD<f32>> {
        forward(&self.session, &self.input_name, &self.output_name, tensor)
    }
}

impl TumorDetector for OnnxDetectionModel {
    fn predict_probability(&self, input: DetectionInput) -> Result<f32> {
        let batched = input.into_batched()?;
        let output = self.forward(batched.view())?;
        output
            .iter()
            .next()
            .copied()
            .ok_or_else(|| PipelineError::Model {
                operation: "reading detection output".to_string(),
                source: "model produced an empty output tensor".into(),
            })
    }
}

/// ONNX backend for the tumor-type model (3-way logits over grayscale NCHW).
pub struct OnnxClassificationModel {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxClassificationModel {
    pub fn load(model_path: &Path, device_id: i32) -> Result<Self> {
        let session = build_session(model_path, device_id)?;

        // The label schema is positional, so a model with a different output
        // width would silently mislabel everything. Fail here instead.
        if let Some(shape) = session.outputs[0].output_type.tensor_shape() {
            if let Some(&width) = shape.last() {
                if width >= 0 && width as usize != TumorClass::ALL.len() {
                    return Err(PipelineError::Configuration {
                        message: format!(
                            "classification model declares {width} output classes, label schema has {}",
                            TumorClass::ALL.len()
                        ),
                    });
                }
            }
        }

        let (input_name, output_name) = io_names(&session);
        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }

    fn forward(&self, tensor: ArrayView4<'_, f32>) -> Result<ArrayD<f32>> {
        forward(&self.session, &self.input_name, &self.output_name, tensor)
    }
}

impl TumorClassifier for OnnxClassificationModel {
    fn classify(&self, image: &RgbImage) -> Result<Classification> {
        // Native-resolution grayscale; the model pools adaptively, so no
        // resize happens on this path.
        let gray = to_grayscale(image);
        let (w, h) = gray.dimensions();
        let plane = Array2::from_shape_vec((h as usize, w as usize), gray.into_raw())
            .map_err(PipelineError::from)?
            .mapv(f32::from);
        let tensor = scale_to_unit(plane)
            .insert_axis(Axis(0))
            .insert_axis(Axis(0));

        let logits = self.forward(tensor.view())?;
        let logits = logits.into_dimensionality::<Ix2>()?;
        if logits.shape() != [1, TumorClass::ALL.len()] {
            return Err(PipelineError::Shape {
                expected: format!("(1, {}) logits", TumorClass::ALL.len()),
                actual: format!("{:?}", logits.shape()),
            });
        }
        Ok(Classification::from_logits([
            logits[[0, 0]],
            logits[[0, 1]],
            logits[[0, 2]],
        ]))
    }
}

/// ONNX backend for the tumor-region model (per-pixel logits, NCHW).
pub struct OnnxSegmentationModel {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxSegmentationModel {
    pub fn load(model_path: &Path, device_id: i32) -> Result<Self> {
        let session = build_session(model_path, device_id)?;
        let (input_name, output_name) = io_names(&session);
        let model = Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        };

        let size = SEGMENTATION_SIZE as usize;
        let zeros = Array4::<f32>::zeros((1, 1, size, size));
        model.forward(zeros.view())?;
        Ok(model)
    }

    fn forward(&self, tensor: ArrayView4<'_, f32>) -> Result<ArrayD<f32>> {
        forward(&self.session, &self.input_name, &self.output_name, tensor)
    }
}

impl TumorSegmenter for OnnxSegmentationModel {
    fn segment(&self, image: &RgbImage) -> Result<BinaryMask> {
        // Original dimensions must be captured before the resize so the mask
        // can be mapped back pixel-for-pixel.
        let (width, height) = image.dimensions();

        let tensor = prepare_segmentation(image);
        let logits = self.forward(tensor.view())?;
        let logits = logits.into_dimensionality::<Ix4>()?;

        let probabilities = logits
            .index_axis(Axis(0), 0)
            .index_axis(Axis(0), 0)
            .mapv(|l| 1.0 / (1.0 + (-l).exp()));
        let mask = BinaryMask::from_probabilities(probabilities.view(), 0.5);
        Ok(mask.resize_nearest(width, height))
    }
}
