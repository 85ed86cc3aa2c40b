use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use detector::DetectorError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("no file field in multipart request")]
    MissingFile,
    #[error("failed to read upload: {0}")]
    Upload(String),
    #[error("failed to store image: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("failed to encode annotated image: {0}")]
    Encode(image::ImageError),
    #[error("detection task failed: {0}")]
    Task(String),
}

impl From<DetectorError> for DetectError {
    fn from(err: DetectorError) -> Self {
        DetectError::Inference(err.to_string())
    }
}

impl IntoResponse for DetectError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Detection request failed");

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": self.to_string() })),
        )
            .into_response()
    }
}
