pub mod config;
pub mod ops;
pub mod pipeline;

use ndarray::Array4;
use transform::MetadataTrail;

pub use config::{DEFAULT_INPUT_SIZE, LONG_MAX_MARGIN};
pub use pipeline::ForwardPipeline;

/// Output of one forward run.
#[derive(Debug)]
pub struct PreprocessResult {
    /// Network blob, `[1, C, H, W]` with red and blue swapped
    pub tensor: Array4<f32>,
    /// Metadata of every executed step, in application order
    pub trail: MetadataTrail,
}
