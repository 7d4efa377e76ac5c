//! JSON API endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use super::super::AppState;
use crate::models::GenerationFormat;

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Personas available to each format.
pub async fn api_personas(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "investigators": state.roster.list(GenerationFormat::Report),
        "hosts": state.roster.list(GenerationFormat::Podcast),
    }))
}

/// Collaborator availability.
pub async fn api_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "ffmpeg": state.ffmpeg_available,
        "llmConfigured": state.llm_configured,
        "ttsConfigured": state.tts_configured,
        "audioDir": state.audio_dir.display().to_string(),
    }))
}
