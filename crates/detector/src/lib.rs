pub mod backend;
pub mod config;
pub mod detector;
pub mod logging;

pub use backend::{InferenceBackend, InferenceOutput};
pub use config::{DetectorConfig, PipelineConfig};
pub use detector::Detector;
pub use postprocess::{Detection, DetectionSet};
