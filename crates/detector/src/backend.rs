use ndarray::{Array3, Array4};

/// Seam to the model runtime. Implementations own the session and only see
/// the network blob.
pub trait InferenceBackend {
    /// Run the model on a `[1, C, H, W]` blob.
    fn infer(&mut self, input: &Array4<f32>) -> anyhow::Result<InferenceOutput>;
}

pub struct InferenceOutput {
    pub boxes: Array3<f32>,  // [1, N, 4] xyxy in model input pixels
    pub scores: Array3<f32>, // [1, N, num_classes] class probabilities
}
