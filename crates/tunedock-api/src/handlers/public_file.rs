//! Public media route: serves stored artifacts by key (no auth).
//! `BASE_URL` for the local backend points here, so the references recorded
//! on completed jobs resolve to this handler.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use futures::StreamExt;
use std::sync::Arc;
use tunedock_core::AppError;
use tunedock_storage::keys;

/// Serve a stored artifact inline. The storage backend rejects traversal
/// outside its root, so the key needs no extra vetting here.
#[tracing::instrument(skip(state), fields(storage_key = %key, operation = "get_public_media"))]
pub async fn get_public_media(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, HttpAppError> {
    let stream = state
        .objects
        .get_stream(&key)
        .await
        .map_err(HttpAppError::from)?;

    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, keys::AUDIO_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(Body::from_stream(body_stream))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError::from(AppError::Internal(e.to_string()))
        })?;

    Ok(response)
}
