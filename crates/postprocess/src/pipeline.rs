use crate::boxes::{rescale_boxes, shift_boxes, xyxy_to_xywh};
use crate::detection::{DetectionSet, best_classes};
use common::span;
use ndarray::{Array2, ArrayView3, Axis};
use std::sync::Arc;
use transform::{MetadataTrail, PipelineError, Result, Step, StepMetadata, Steps};

pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.25;

/// Maps raw model outputs back to original image coordinates by undoing the
/// geometric steps of the forward pass, last step first.
#[derive(Debug, Clone)]
pub struct InversePipeline {
    steps: Arc<Steps>,
    /// Handed to the downstream suppression stage, not applied here
    pub iou_threshold: f32,
    /// Handed to the downstream filtering stage, not applied here
    pub score_threshold: f32,
}

impl InversePipeline {
    pub fn new(steps: impl Into<Arc<Steps>>) -> Self {
        Self {
            steps: steps.into(),
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }

    pub fn with_thresholds(mut self, iou_threshold: f32, score_threshold: f32) -> Self {
        self.iou_threshold = iou_threshold;
        self.score_threshold = score_threshold;
        self
    }

    pub fn steps(&self) -> &Arc<Steps> {
        &self.steps
    }

    /// Correct raw boxes using the trail of the matching forward run.
    ///
    /// `raw_boxes` is `[1, N, 4]` in corner form, `class_scores` is
    /// `[1, N, K]`. The trail is consumed.
    pub fn run(
        &self,
        raw_boxes: ArrayView3<f32>,
        class_scores: ArrayView3<f32>,
        mut trail: MetadataTrail,
    ) -> Result<DetectionSet> {
        let _s = span!("inverse_pipeline", candidates = raw_boxes.shape()[1]);

        validate_outputs(&raw_boxes, &class_scores)?;

        let expected = self.steps.active_count();
        if trail.len() != expected {
            return Err(PipelineError::alignment(format!(
                "expected {} metadata entries for the configured steps, found {}",
                expected,
                trail.len()
            )));
        }

        let mut boxes = raw_boxes.index_axis(Axis(0), 0).to_owned();

        for step in self.steps.active().rev() {
            let entry = trail.pop().ok_or_else(|| {
                PipelineError::alignment(format!("trail exhausted before {}", step.name()))
            })?;
            boxes = invert_step(step, entry, boxes)?;
        }

        let (scores, classes) = best_classes(class_scores.index_axis(Axis(0), 0));

        tracing::debug!(candidates = scores.len(), "Mapped detections to image space");

        Ok(DetectionSet {
            boxes: xyxy_to_xywh(boxes.view()),
            scores,
            classes,
        })
    }
}

fn invert_step(
    step: &Step,
    entry: Option<StepMetadata>,
    boxes: Array2<f32>,
) -> Result<Array2<f32>> {
    match (step, entry) {
        (Step::DetRescale | Step::DetLongMaxRescale, Some(StepMetadata::ScaleFactors { x, y })) => {
            tracing::trace!(step = step.name(), x, y, "Rescaling boxes");
            Ok(rescale_boxes(boxes.view(), x, y))
        }
        (Step::BotRightPad { .. } | Step::CenterPad { .. }, Some(StepMetadata::Padding(padding))) => {
            tracing::trace!(step = step.name(), ?padding, "Shifting boxes");
            Ok(shift_boxes(
                boxes.view(),
                padding.left as f32,
                padding.top as f32,
            ))
        }
        (Step::Standardize { .. } | Step::Normalize { .. }, None) => Ok(boxes),
        (step, entry) => Err(PipelineError::alignment(format!(
            "{} cannot be inverted with metadata {:?}",
            step.name(),
            entry
        ))),
    }
}

fn validate_outputs(raw_boxes: &ArrayView3<f32>, class_scores: &ArrayView3<f32>) -> Result<()> {
    let (batch, candidates, coords) = raw_boxes.dim();
    let (score_batch, score_candidates, classes) = class_scores.dim();

    if batch != 1 || score_batch != 1 {
        return Err(PipelineError::shape(format!(
            "expected a batch of one image, got boxes batch {} and scores batch {}",
            batch, score_batch
        )));
    }
    if coords != 4 {
        return Err(PipelineError::shape(format!(
            "boxes must have 4 coordinates, got {}",
            coords
        )));
    }
    if candidates != score_candidates {
        return Err(PipelineError::shape(format!(
            "{} boxes but {} score rows",
            candidates, score_candidates
        )));
    }
    if candidates > 0 && classes == 0 {
        return Err(PipelineError::shape("class scores have no classes"));
    }
    Ok(())
}
