pub mod ort;

use ndarray::{Array, IxDyn};

/// Abstraction over the inference runtime.
///
/// Input is a `[1, 3, H, W]` normalized image tensor; output is the raw
/// `[1, 4 + num_classes, num_anchors]` prediction tensor.
pub trait InferenceBackend: Send + Sized + 'static {
    fn load_model(path: &str) -> anyhow::Result<Self>;

    fn infer(&mut self, input: &Array<f32, IxDyn>) -> anyhow::Result<Array<f32, IxDyn>>;
}
