use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response, StatusCode},
    response::{IntoResponse, Redirect},
};
use futures::StreamExt;
use std::sync::Arc;
use tunedock_core::models::{Job, JobStatus};
use tunedock_core::AppError;
use tunedock_storage::keys;
use uuid::Uuid;

/// File name offered to the browser. Titles pass through a conservative
/// filter so the Content-Disposition header stays well-formed.
fn attachment_filename(job: &Job) -> String {
    let stem: String = job
        .title
        .as_deref()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || " ._-()".contains(*c))
        .collect();
    let stem = stem.trim();
    if stem.is_empty() {
        keys::artifact_filename(job.id)
    } else {
        format!("{}.mp3", stem)
    }
}

#[utoipa::path(
    get,
    path = "/download/{id}",
    tag = "library",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "MP3 artifact", content_type = "audio/mpeg"),
        (status = 400, description = "Job is not completed", body = ErrorResponse),
        (status = 404, description = "Job not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(job_id = %id, operation = "download_file"))]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let job = state
        .metadata
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    if job.status != JobStatus::Completed {
        return Err(AppError::Validation("Job is not completed".to_string()).into());
    }

    let key = job
        .storage_key
        .as_deref()
        .ok_or_else(|| AppError::Internal("Completed job has no storage key".to_string()))?;

    tracing::debug!(job_id = %id, storage_key = %key, "Proxying artifact from storage");

    let stream = state
        .objects
        .get_stream(key)
        .await
        .map_err(HttpAppError::from)?;

    // Wrap storage stream for axum Body
    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    let content_disposition = format!("attachment; filename=\"{}\"", attachment_filename(&job));

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, keys::AUDIO_CONTENT_TYPE)
        .header(header::CONTENT_DISPOSITION, content_disposition.as_str())
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .body(Body::from_stream(body_stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

#[utoipa::path(
    get,
    path = "/play/{id}",
    tag = "library",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 303, description = "Redirect to the durable artifact"),
        (status = 400, description = "Job is not completed", body = ErrorResponse),
        (status = 404, description = "Job not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(job_id = %id, operation = "play_file"))]
pub async fn play_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let job = state
        .metadata
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    if job.status != JobStatus::Completed {
        return Err(AppError::Validation("Job is not completed".to_string()).into());
    }

    let artifact_ref = job
        .artifact_ref
        .as_deref()
        .ok_or_else(|| AppError::Internal("Completed job has no artifact reference".to_string()))?;

    Ok(Redirect::to(artifact_ref))
}
