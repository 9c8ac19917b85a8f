pub mod adapters;
pub mod config;
pub mod errors;
pub mod image_io;
pub mod labels;
pub mod mask;
pub mod model;
pub mod overlay;
pub mod pipeline;
pub mod preprocess;

pub mod mocks;

pub use adapters::{DetectionInput, TumorClassifier, TumorDetector, TumorSegmenter};
pub use config::Config;
pub use errors::{PipelineError, Result};
pub use labels::{Classification, TumorClass};
pub use mask::BinaryMask;
pub use model::{ModelPaths, ModelRegistry};
pub use overlay::{overlay_mask, OVERLAY_ALPHA, OVERLAY_COLOR};
pub use pipeline::{Pipeline, PipelineResult, TumorFindings, TUMOR_THRESHOLD};
