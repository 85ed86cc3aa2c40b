use crate::{
    backend::InferenceBackend,
    classes,
    config::DetectorConfig,
    postprocessing::{Detection, PostProcessor, TransformParams},
    preprocessing::PreProcessor,
};
use image::RgbImage;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("failed to load model: {0}")]
    ModelLoad(#[source] anyhow::Error),
    #[error("inference failed: {0}")]
    Inference(#[source] anyhow::Error),
}

/// Detection service built once at startup and shared across requests.
///
/// The backend session and the preprocessor scratch buffers both need `&mut`,
/// so they live behind a mutex; postprocessing works on the extracted tensor
/// and runs outside the lock.
pub struct Detector<B: InferenceBackend> {
    inner: Mutex<Inner<B>>,
    postprocessor: PostProcessor,
}

struct Inner<B> {
    backend: B,
    preprocessor: PreProcessor,
}

impl<B: InferenceBackend> Detector<B> {
    /// Load the model and build the detection pipeline around it.
    pub fn load(config: &DetectorConfig) -> Result<Self, DetectorError> {
        let backend = B::load_model(&config.model_path).map_err(DetectorError::ModelLoad)?;
        Ok(Self::new(backend, config))
    }

    pub fn new(backend: B, config: &DetectorConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                backend,
                preprocessor: PreProcessor::new(config.input_size),
            }),
            postprocessor: PostProcessor::new(config.confidence_threshold, config.iou_threshold),
        }
    }

    /// Run the full pipeline on one image and return its detections.
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, DetectorError> {
        let (width, height) = image.dimensions();

        let (output, scale, offset_x, offset_y) = {
            let mut inner = self.inner.lock().map_err(|_| {
                DetectorError::Inference(anyhow::anyhow!(
                    "detector state poisoned by an earlier panic"
                ))
            })?;

            let (input, scale, offset_x, offset_y) = inner
                .preprocessor
                .preprocess(image)
                .map_err(DetectorError::Inference)?;

            let output = inner
                .backend
                .infer(&input)
                .map_err(DetectorError::Inference)?;

            (output, scale, offset_x, offset_y)
        };

        let transform = TransformParams {
            orig_width: width,
            orig_height: height,
            scale,
            offset_x,
            offset_y,
        };

        let detections = self
            .postprocessor
            .parse_detections(&output.view(), &transform)
            .map_err(DetectorError::Inference)?;

        tracing::debug!(
            width,
            height,
            detections = detections.len(),
            classes = ?detections
                .iter()
                .map(|d| classes::class_name(d.class_id))
                .collect::<Vec<_>>(),
            "Image processed"
        );

        Ok(detections)
    }
}
