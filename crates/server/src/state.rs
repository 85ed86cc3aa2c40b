use crate::storage::ImageStore;
use detector::{Detection, Detector, DetectorError, InferenceBackend};
use image::RgbImage;
use std::sync::Arc;

/// Seam between the HTTP layer and the model, so handlers can be exercised
/// with a stub service in tests.
pub trait DetectService: Send + Sync + 'static {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, DetectorError>;
}

impl<B: InferenceBackend> DetectService for Detector<B> {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, DetectorError> {
        Detector::detect(self, image)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<dyn DetectService>,
    pub store: ImageStore,
}

impl AppState {
    pub fn new(detector: Arc<dyn DetectService>, store: ImageStore) -> Self {
        Self { detector, store }
    }
}
