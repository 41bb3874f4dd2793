use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Metadata trail misaligned: {0}")]
    Alignment(String),

    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Resize failed: {0}")]
    Resize(String),

    #[error("Tensor error: {0}")]
    Tensor(#[from] ndarray::ShapeError),
}

impl PipelineError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn alignment(msg: impl Into<String>) -> Self {
        Self::Alignment(msg.into())
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }
}
