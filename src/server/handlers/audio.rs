//! Generated audio retrieval.

use std::path::Path;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::super::AppState;

const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Query parameters for `GET /api/audio`.
#[derive(Debug, Deserialize)]
pub struct AudioParams {
    pub id: Option<String>,
}

/// Serve a generated programme by file name.
///
/// Only bare file names inside the audio directory are served: anything with
/// a path component is refused before touching the filesystem.
pub async fn serve_audio(State(state): State<AppState>, Query(params): Query<AudioParams>) -> Response {
    let id = match params.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(id) => id.to_string(),
        None => return (StatusCode::BAD_REQUEST, "Missing id parameter").into_response(),
    };

    let basename = Path::new(&id).file_name().and_then(|n| n.to_str());
    if basename != Some(id.as_str()) {
        tracing::warn!("Rejected audio path traversal attempt: {:?}", id);
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }

    let canonical_audio_dir = match state.audio_dir.canonicalize() {
        Ok(p) => p,
        // Nothing has been generated yet
        Err(_) => return (StatusCode::NOT_FOUND, "File not found").into_response(),
    };

    let canonical_file = match canonical_audio_dir.join(&id).canonicalize() {
        Ok(p) => p,
        Err(_) => return (StatusCode::NOT_FOUND, "File not found").into_response(),
    };

    // Symlinks must not lead out of the audio directory
    if !canonical_file.starts_with(&canonical_audio_dir) {
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }
    if !canonical_file.is_file() {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    }

    let content = match tokio::fs::read(&canonical_file).await {
        Ok(c) => c,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file").into_response();
        }
    };

    let mime = mime_guess::from_path(&canonical_file)
        .first_or_octet_stream()
        .to_string();

    (
        [
            (header::CONTENT_TYPE, mime),
            (header::CACHE_CONTROL, CACHE_CONTROL.to_string()),
        ],
        content,
    )
        .into_response()
}
