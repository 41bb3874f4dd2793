use anyhow::Context;
use postprocess::{DEFAULT_IOU_THRESHOLD, DEFAULT_SCORE_THRESHOLD, InversePipeline};
use preprocess::{DEFAULT_INPUT_SIZE, ForwardPipeline};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use transform::Steps;

pub use common::Environment;

/// Preprocessing description shipped alongside an exported model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineConfig {
    pub steps: Steps,
    /// Network input `(width, height)`
    #[serde(default = "default_out_shape")]
    pub out_shape: (u32, u32),
    #[serde(default = "default_iou_threshold", alias = "iou_tresh")]
    pub iou_threshold: f32,
    #[serde(default = "default_score_threshold", alias = "score_tresh")]
    pub score_threshold: f32,
}

fn default_out_shape() -> (u32, u32) {
    DEFAULT_INPUT_SIZE
}

fn default_iou_threshold() -> f32 {
    DEFAULT_IOU_THRESHOLD
}

fn default_score_threshold() -> f32 {
    DEFAULT_SCORE_THRESHOLD
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: Self =
            serde_json::from_str(json).context("Failed to parse pipeline configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline configuration {}", path.display()))?;
        Self::from_json_str(&json)
            .with_context(|| format!("Invalid pipeline configuration {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("iou_threshold", self.iou_threshold),
            ("score_threshold", self.score_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{} must be within [0, 1], got {}", name, value);
            }
        }
        Ok(())
    }

    /// Build the paired pipelines. Both share one immutable step list.
    pub fn build(&self) -> transform::Result<(ForwardPipeline, InversePipeline)> {
        let steps = Arc::new(self.steps.clone());
        let forward = ForwardPipeline::new(Arc::clone(&steps), self.out_shape)?;
        let inverse =
            InversePipeline::new(steps).with_thresholds(self.iou_threshold, self.score_threshold);
        Ok((forward, inverse))
    }
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub environment: Environment,
    pub pipeline_config_path: PathBuf,
    pub pipeline: PipelineConfig,
}

impl DetectorConfig {
    /// Load configuration from environment variables.
    ///
    /// `PIPELINE_CONFIG_PATH` is required. `SCORE_THRESHOLD` and
    /// `IOU_THRESHOLD` override the values from the file when they parse.
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();

        let pipeline_config_path: PathBuf = env::var("PIPELINE_CONFIG_PATH")
            .context("PIPELINE_CONFIG_PATH must point to the pipeline configuration")?
            .into();

        let mut pipeline = PipelineConfig::from_path(&pipeline_config_path)?;

        if let Some(score_threshold) = env::var("SCORE_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            pipeline.score_threshold = score_threshold;
        }

        if let Some(iou_threshold) = env::var("IOU_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            pipeline.iou_threshold = iou_threshold;
        }

        pipeline.validate()?;

        Ok(Self {
            environment,
            pipeline_config_path,
            pipeline,
        })
    }
}
