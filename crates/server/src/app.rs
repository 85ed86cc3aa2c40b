use crate::{config::ServerConfig, routes, state::AppState};
use axum::{Router, extract::DefaultBodyLimit, routing::post};
use tower_http::cors::CorsLayer;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/detect", post(routes::detect::detect))
        // Uploads are not size-limited
        .layer(DefaultBodyLimit::disable())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

pub async fn run_server(config: &ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!("Server listening on {}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
