use crate::{
    error::DetectError,
    state::{AppState, DetectService},
    storage::ImageStore,
};
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
};
use detector::annotate;
use std::io::Cursor;
use std::sync::Arc;

pub const NO_DETECTIONS_HEADER: &str = "x-detection";
pub const NO_DETECTIONS_MESSAGE: &str = "No detections found.";

enum Outcome {
    NoDetections,
    Annotated(Vec<u8>),
}

/// POST /detect
///
/// Persists the upload under a fresh UUID, runs the detector, and responds
/// with either the untouched original (marker header, zero detections) or an
/// annotated JPEG. The annotated copy is persisted under the same name.
pub async fn detect(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, DetectError> {
    tracing::info!("Received a detection request");

    let upload = read_upload(&mut multipart).await?;

    let name = ImageStore::new_image_name();
    state.store.ensure_dirs().await?;
    let original_path = state.store.save_original(&name, &upload).await?;
    tracing::info!(path = %original_path.display(), "Saved uploaded image");

    let detector = state.detector.clone();
    let image_bytes = upload.clone();
    let outcome = tokio::task::spawn_blocking(move || run_detection(detector, &image_bytes))
        .await
        .map_err(|e| DetectError::Task(e.to_string()))??;

    match outcome {
        Outcome::NoDetections => {
            tracing::info!("No detections found in the image");
            Ok((
                [
                    (header::CONTENT_TYPE.as_str(), "image/jpeg"),
                    (NO_DETECTIONS_HEADER, NO_DETECTIONS_MESSAGE),
                ],
                upload,
            )
                .into_response())
        }
        Outcome::Annotated(jpeg) => {
            let annotated_path = state.store.save_annotated(&name, &jpeg).await?;
            tracing::info!(path = %annotated_path.display(), "Annotated image saved");
            Ok(([(header::CONTENT_TYPE.as_str(), "image/jpeg")], jpeg).into_response())
        }
    }
}

/// Pull the first file field out of the multipart form. Non-file fields
/// (no filename in the part headers) are skipped.
async fn read_upload(multipart: &mut Multipart) -> Result<Bytes, DetectError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DetectError::Upload(e.to_string()))?
    {
        if field.file_name().is_none() {
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| DetectError::Upload(e.to_string()))?;
        return Ok(data);
    }

    Err(DetectError::MissingFile)
}

// Decode, inference, annotation and JPEG encoding are all CPU-bound, so the
// whole pipeline runs on a blocking thread.
fn run_detection(detector: Arc<dyn DetectService>, bytes: &[u8]) -> Result<Outcome, DetectError> {
    let image = image::load_from_memory(bytes)?.to_rgb8();

    let detections = detector.detect(&image)?;

    if detections.is_empty() {
        return Ok(Outcome::NoDetections);
    }

    tracing::info!(detections = detections.len(), "Detections found");

    let mut annotated = image;
    annotate::draw_detections(&mut annotated, &detections);

    let mut jpeg_bytes = Cursor::new(Vec::new());
    annotated
        .write_to(&mut jpeg_bytes, image::ImageFormat::Jpeg)
        .map_err(DetectError::Encode)?;

    Ok(Outcome::Annotated(jpeg_bytes.into_inner()))
}
