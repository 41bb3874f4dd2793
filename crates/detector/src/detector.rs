use crate::backend::InferenceBackend;
use crate::config::PipelineConfig;
use common::span;
use ndarray::ArrayView3;
use postprocess::{DetectionSet, InversePipeline};
use preprocess::{ForwardPipeline, PreprocessResult};

/// Runs one image through preprocessing, the model and box correction.
pub struct Detector<B: InferenceBackend> {
    backend: B,
    forward: ForwardPipeline,
    inverse: InversePipeline,
}

impl<B: InferenceBackend> Detector<B> {
    pub fn new(backend: B, config: &PipelineConfig) -> anyhow::Result<Self> {
        let (forward, inverse) = config.build()?;

        tracing::info!(
            steps = forward.steps().active_count(),
            out_shape = ?forward.out_shape(),
            iou_threshold = inverse.iou_threshold,
            score_threshold = inverse.score_threshold,
            "Detector pipeline ready"
        );

        Ok(Self {
            backend,
            forward,
            inverse,
        })
    }

    /// Detect objects in a height × width × channel image. Boxes come back as
    /// `[x, y, w, h]` in the image's own pixel coordinates, unfiltered.
    pub fn detect<A>(&mut self, image: ArrayView3<'_, A>) -> anyhow::Result<DetectionSet>
    where
        A: Copy + Into<f32>,
    {
        let _s = span!("detect");

        let PreprocessResult { tensor, trail } = self.forward.run(image)?;
        let output = self.backend.infer(&tensor)?;
        let detections = self
            .inverse
            .run(output.boxes.view(), output.scores.view(), trail)?;

        tracing::debug!(candidates = detections.len(), "Detection complete");
        Ok(detections)
    }

    pub fn iou_threshold(&self) -> f32 {
        self.inverse.iou_threshold
    }

    pub fn score_threshold(&self) -> f32 {
        self.inverse.score_threshold
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
