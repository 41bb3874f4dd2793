use crate::config::LONG_MAX_MARGIN;
use crate::{PreprocessResult, ops};
use common::span;
use ndarray::{Array3, ArrayView3};
use std::sync::Arc;
use transform::{MetadataTrail, Padding, PipelineError, Result, Step, StepMetadata, Steps};

/// Applies the configured steps to one image and records what each step did.
#[derive(Debug, Clone)]
pub struct ForwardPipeline {
    steps: Arc<Steps>,
    /// Target `(width, height)`
    out_shape: (u32, u32),
}

impl ForwardPipeline {
    pub fn new(steps: impl Into<Arc<Steps>>, out_shape: (u32, u32)) -> Result<Self> {
        let steps = steps.into();
        let (out_width, out_height) = out_shape;

        if out_width == 0 || out_height == 0 {
            return Err(PipelineError::configuration(format!(
                "output shape must be non-zero, got {}x{}",
                out_width, out_height
            )));
        }

        let long_max = steps.active().any(|s| matches!(s, Step::DetLongMaxRescale));
        if long_max && (out_width <= LONG_MAX_MARGIN || out_height <= LONG_MAX_MARGIN) {
            return Err(PipelineError::configuration(format!(
                "output shape {}x{} leaves no room for the {}px DetLongMaxRescale margin",
                out_width, out_height, LONG_MAX_MARGIN
            )));
        }

        Ok(Self { steps, out_shape })
    }

    pub fn steps(&self) -> &Arc<Steps> {
        &self.steps
    }

    pub fn out_shape(&self) -> (u32, u32) {
        self.out_shape
    }

    /// Run every non-empty step on a copy of `image` (height × width ×
    /// channel) and convert the result to the network blob.
    pub fn run<A>(&self, image: ArrayView3<'_, A>) -> Result<PreprocessResult>
    where
        A: Copy + Into<f32>,
    {
        let _s = span!("forward_pipeline");

        let (height, width, channels) = image.dim();
        tracing::trace!(
            height,
            width,
            channels,
            steps = self.steps.active_count(),
            "Preprocessing image dimensions"
        );

        if height == 0 || width == 0 || channels == 0 {
            return Err(PipelineError::shape(format!(
                "image must be non-empty, got {}x{}x{}",
                height, width, channels
            )));
        }

        let mut working: Array3<f32> = image.mapv(|v: A| -> f32 { v.into() });
        let mut trail = MetadataTrail::with_capacity(self.steps.active_count());

        for step in self.steps.active() {
            let (next, metadata) = self.apply(step, working)?;
            tracing::debug!(
                step = step.name(),
                ?metadata,
                shape = ?next.dim(),
                "Applied preprocessing step"
            );
            working = next;
            trail.push(metadata);
        }

        Ok(PreprocessResult {
            tensor: ops::to_blob(working),
            trail,
        })
    }

    fn apply(
        &self,
        step: &Step,
        mut image: Array3<f32>,
    ) -> Result<(Array3<f32>, Option<StepMetadata>)> {
        match step {
            Step::Standardize { max_value } => {
                ops::standardize(&mut image, *max_value);
                Ok((image, None))
            }
            Step::Normalize { mean, std } => {
                ops::normalize(&mut image, mean, std)?;
                Ok((image, None))
            }
            Step::DetRescale => self.det_rescale(image),
            Step::DetLongMaxRescale => self.det_long_max_rescale(image),
            Step::BotRightPad { pad_value } => {
                let (pad_height, pad_width) = self.pad_amounts(&image, step)?;
                let padding = Padding {
                    top: 0,
                    bottom: pad_height,
                    left: 0,
                    right: pad_width,
                };
                Ok((
                    ops::pad(&image, padding, *pad_value),
                    Some(StepMetadata::Padding(padding)),
                ))
            }
            Step::CenterPad { pad_value } => {
                let (pad_height, pad_width) = self.pad_amounts(&image, step)?;
                let (top, left) = (pad_height / 2, pad_width / 2);
                let padding = Padding {
                    top,
                    bottom: pad_height - top,
                    left,
                    right: pad_width - left,
                };
                Ok((
                    ops::pad(&image, padding, *pad_value),
                    Some(StepMetadata::Padding(padding)),
                ))
            }
        }
    }

    fn det_rescale(&self, image: Array3<f32>) -> Result<(Array3<f32>, Option<StepMetadata>)> {
        let (height, width, _) = image.dim();
        let (out_width, out_height) = self.out_shape;

        let metadata = StepMetadata::ScaleFactors {
            x: out_width as f32 / width as f32,
            y: out_height as f32 / height as f32,
        };

        Ok((
            ops::resize(&image, out_width, out_height)?,
            Some(metadata),
        ))
    }

    fn det_long_max_rescale(
        &self,
        image: Array3<f32>,
    ) -> Result<(Array3<f32>, Option<StepMetadata>)> {
        let (height, width, _) = image.dim();
        let (out_width, out_height) = self.out_shape;

        let factor = ((out_height - LONG_MAX_MARGIN) as f32 / height as f32)
            .min((out_width - LONG_MAX_MARGIN) as f32 / width as f32);

        let image = if factor != 1.0 {
            ops::resize(
                &image,
                scaled_length(width, factor),
                scaled_length(height, factor),
            )?
        } else {
            image
        };

        Ok((
            image,
            Some(StepMetadata::ScaleFactors {
                x: factor,
                y: factor,
            }),
        ))
    }

    /// Rows and columns a pad step has to add to reach the output shape.
    fn pad_amounts(&self, image: &Array3<f32>, step: &Step) -> Result<(usize, usize)> {
        let (height, width, _) = image.dim();
        let (out_width, out_height) = (self.out_shape.0 as usize, self.out_shape.1 as usize);

        if height > out_height || width > out_width {
            return Err(PipelineError::configuration(format!(
                "{} cannot pad a {}x{} image into {}x{}; rescale it first",
                step.name(),
                width,
                height,
                out_width,
                out_height
            )));
        }

        Ok((out_height - height, out_width - width))
    }
}

fn scaled_length(length: usize, factor: f32) -> u32 {
    (length as f32 * factor).round_ties_even().max(1.0) as u32
}
