use detector::{Detector, backend::ort::OrtBackend};
use server::{app::run_server, config::ServerConfig, state::AppState, storage::ImageStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();
    common::setup_logging(&config.log_level, &config.environment);

    tracing::info!(config = ?config, "Loaded configuration");

    tracing::info!(model_path = %config.detector.model_path, "Loading detection model");
    let detector = Detector::<OrtBackend>::load(&config.detector).inspect_err(|e| {
        tracing::error!(error = %e, "Failed to load model");
    })?;
    tracing::info!("Model loaded successfully");

    let store = ImageStore::new(&config.images_dir);
    let state = AppState::new(Arc::new(detector), store);

    run_server(&config, state).await
}
