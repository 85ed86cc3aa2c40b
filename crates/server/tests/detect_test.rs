use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use detector::{BoundingBox, Detection, DetectorError};
use image::RgbImage;
use server::build_router;
use server::state::{AppState, DetectService};
use server::storage::ImageStore;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

struct StubDetector {
    detections: Vec<Detection>,
}

impl StubDetector {
    fn empty() -> Self {
        Self { detections: vec![] }
    }

    fn with_one_box() -> Self {
        Self {
            detections: vec![Detection {
                bbox: BoundingBox {
                    x1: 8.0,
                    y1: 8.0,
                    x2: 40.0,
                    y2: 40.0,
                },
                confidence: 0.9,
                class_id: 0,
            }],
        }
    }
}

impl DetectService for StubDetector {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<Detection>, DetectorError> {
        Ok(self.detections.clone())
    }
}

struct FailingDetector;

impl DetectService for FailingDetector {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<Detection>, DetectorError> {
        Err(DetectorError::Inference(anyhow::anyhow!("model exploded")))
    }
}

fn test_server(detector: Arc<dyn DetectService>, root: &Path) -> TestServer {
    let state = AppState::new(detector, ImageStore::new(root));
    TestServer::new(build_router(state)).unwrap()
}

/// In-memory JPEG of a small gray image
fn test_jpeg() -> Vec<u8> {
    let img = RgbImage::from_pixel(64, 64, image::Rgb([120, 120, 120]));
    let mut bytes = std::io::Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Jpeg).unwrap();
    bytes.into_inner()
}

/// JPEG of per-pixel noise; incompressible, so it comes out well over 2 MB
fn large_test_jpeg() -> Vec<u8> {
    let img = RgbImage::from_fn(2560, 2560, |x, y| {
        let mut h = x.wrapping_mul(0x9E37_79B1) ^ y.wrapping_mul(0x85EB_CA77);
        h ^= h >> 13;
        h = h.wrapping_mul(0xC2B2_AE3D);
        h ^= h >> 16;
        image::Rgb([(h & 0xFF) as u8, ((h >> 8) & 0xFF) as u8, ((h >> 16) & 0xFF) as u8])
    });
    let mut bytes = std::io::Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Jpeg).unwrap();
    bytes.into_inner()
}

fn upload_form(bytes: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(bytes)
            .file_name("test.jpg")
            .mime_type("image/jpeg"),
    )
}

fn files_in(dir: &Path) -> Vec<std::path::PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => vec![],
    }
}

#[tokio::test]
async fn no_detections_returns_original_with_marker_header() {
    let root = TempDir::new().unwrap();
    let server = test_server(Arc::new(StubDetector::empty()), root.path());

    let upload = test_jpeg();
    let response = server
        .post("/detect")
        .multipart(upload_form(upload.clone()))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "image/jpeg");
    assert_eq!(response.header("x-detection"), "No detections found.");
    assert_eq!(
        response.as_bytes().as_ref(),
        upload.as_slice(),
        "Original bytes pass through untouched"
    );

    assert_eq!(files_in(&root.path().join("original")).len(), 1);
    assert!(
        files_in(&root.path().join("annotated")).is_empty(),
        "No annotated file without detections"
    );
}

#[tokio::test]
async fn detections_return_annotated_jpeg() {
    let root = TempDir::new().unwrap();
    let server = test_server(Arc::new(StubDetector::with_one_box()), root.path());

    let upload = test_jpeg();
    let response = server
        .post("/detect")
        .multipart(upload_form(upload.clone()))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "image/jpeg");
    assert!(
        !response.headers().contains_key("x-detection"),
        "Marker header only appears without detections"
    );
    assert_ne!(
        response.as_bytes().as_ref(),
        upload.as_slice(),
        "Annotation changes the body"
    );

    // The response decodes as an image of the original dimensions
    let annotated = image::load_from_memory(response.as_bytes()).unwrap();
    assert_eq!(annotated.width(), 64);
    assert_eq!(annotated.height(), 64);

    let annotated_files = files_in(&root.path().join("annotated"));
    assert_eq!(annotated_files.len(), 1);
    assert_eq!(
        std::fs::read(&annotated_files[0]).unwrap(),
        response.as_bytes().as_ref(),
        "Persisted annotated file matches the response body"
    );

    // Original and annotated share the same filename
    let original_files = files_in(&root.path().join("original"));
    assert_eq!(
        original_files[0].file_name(),
        annotated_files[0].file_name()
    );
}

#[tokio::test]
async fn corrupt_upload_returns_500_with_detail() {
    let root = TempDir::new().unwrap();
    let server = test_server(Arc::new(StubDetector::empty()), root.path());

    let response = server
        .post("/detect")
        .multipart(upload_form(b"definitely not an image".to_vec()))
        .await;

    response.assert_status_internal_server_error();
    let body: serde_json::Value = response.json();
    assert!(
        !body["detail"].as_str().unwrap().is_empty(),
        "Detail must carry the error message"
    );

    // The upload was persisted before decoding failed
    assert_eq!(files_in(&root.path().join("original")).len(), 1);

    // The server keeps serving after a failed request
    let ok = server.post("/detect").multipart(upload_form(test_jpeg())).await;
    ok.assert_status_ok();
}

#[tokio::test]
async fn inference_failure_returns_500_with_detail() {
    let root = TempDir::new().unwrap();
    let server = test_server(Arc::new(FailingDetector), root.path());

    let response = server
        .post("/detect")
        .multipart(upload_form(test_jpeg()))
        .await;

    response.assert_status_internal_server_error();
    let body: serde_json::Value = response.json();
    assert!(body["detail"].as_str().unwrap().contains("inference failed"));
}

#[tokio::test]
async fn form_without_file_field_returns_500() {
    let root = TempDir::new().unwrap();
    let server = test_server(Arc::new(StubDetector::empty()), root.path());

    // A text-only form has no filename on any part
    let response = server
        .post("/detect")
        .multipart(MultipartForm::new().add_text("note", "no file here"))
        .await;

    response.assert_status_internal_server_error();
    let body: serde_json::Value = response.json();
    assert!(body["detail"].as_str().unwrap().contains("file field"));
}

#[tokio::test]
async fn empty_multipart_body_returns_500() {
    let root = TempDir::new().unwrap();
    let server = test_server(Arc::new(StubDetector::empty()), root.path());

    // A form with zero parts does not even parse as multipart
    let response = server.post("/detect").multipart(MultipartForm::new()).await;

    response.assert_status_internal_server_error();
    let body: serde_json::Value = response.json();
    assert!(!body["detail"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn large_upload_is_accepted() {
    let root = TempDir::new().unwrap();
    let server = test_server(Arc::new(StubDetector::empty()), root.path());

    let upload = large_test_jpeg();
    assert!(
        upload.len() > 2 * 1024 * 1024,
        "noise image must exceed axum's default 2 MB body limit (got {} bytes)",
        upload.len()
    );

    let response = server
        .post("/detect")
        .multipart(upload_form(upload.clone()))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "image/jpeg");
    assert_eq!(
        response.as_bytes().as_ref(),
        upload.as_slice(),
        "Large uploads pass through like any other"
    );
}

#[tokio::test]
async fn concurrent_uploads_get_distinct_files() {
    let root = TempDir::new().unwrap();
    let server = test_server(Arc::new(StubDetector::with_one_box()), root.path());

    // Drive the four requests concurrently on this task
    let (a, b, c, d) = tokio::join!(
        server.post("/detect").multipart(upload_form(test_jpeg())),
        server.post("/detect").multipart(upload_form(test_jpeg())),
        server.post("/detect").multipart(upload_form(test_jpeg())),
        server.post("/detect").multipart(upload_form(test_jpeg())),
    );
    for response in [a, b, c, d] {
        response.assert_status_ok();
    }

    assert_eq!(files_in(&root.path().join("original")).len(), 4);
    assert_eq!(files_in(&root.path().join("annotated")).len(), 4);
}
