//! Shared data model for the detection transform pipeline: the configured
//! steps, the metadata they record, and the error taxonomy used by both the
//! forward and the inverse pass.

pub mod errors;
pub mod metadata;
pub mod step;

pub use errors::PipelineError;
pub use metadata::{MetadataTrail, Padding, StepMetadata};
pub use step::{Step, Steps};

pub type Result<T> = std::result::Result<T, PipelineError>;
