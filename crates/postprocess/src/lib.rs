pub mod boxes;
pub mod detection;
pub mod pipeline;

pub use detection::{Detection, DetectionSet};
pub use pipeline::{DEFAULT_IOU_THRESHOLD, DEFAULT_SCORE_THRESHOLD, InversePipeline};
