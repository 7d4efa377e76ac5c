//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Generation (SSE)
        .route("/api/report", post(handlers::generate_report))
        .route("/api/podcast", post(handlers::generate_podcast))
        // Generated media
        .route("/api/audio", get(handlers::serve_audio))
        // Metadata
        .route("/api/personas", get(handlers::api_personas))
        .route("/api/status", get(handlers::api_status))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
