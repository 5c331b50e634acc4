use crate::error::{ErrorResponse, HttpAppError};
use crate::identity::CallerIdentity;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tunedock_core::AppError;
use tunedock_storage::keys;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct FileDeleted {
    pub id: Uuid,
    pub deleted: bool,
}

#[utoipa::path(
    delete,
    path = "/files/{id}",
    tag = "library",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "File and job record deleted", body = FileDeleted),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 404, description = "Job not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state),
    fields(requester_id = %caller.0, job_id = %id, operation = "delete_file")
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    if !state.identity.is_owner(&caller.0).await? {
        return Err(AppError::Authorization("Only the owner can delete files".to_string()).into());
    }

    let job = state
        .metadata
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    // Durable artifact first; the record carries the exact key it was stored
    // under.
    if let Some(key) = job.storage_key.as_deref() {
        state.objects.delete(key).await.map_err(HttpAppError::from)?;
    }

    // A scratch artifact lingers when the pipeline failed after transcoding.
    let scratch = keys::scratch_dir(&state.scratch_root, &job.requester_id, job.folder.as_deref())
        .join(keys::artifact_filename(job.id));
    if let Err(e) = tokio::fs::remove_file(&scratch).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!(path = %scratch.display(), error = %e, "Scratch file not removed");
        }
    }

    if !state.metadata.delete(job.id).await? {
        return Err(AppError::NotFound("Job not found".to_string()).into());
    }

    tracing::info!(job_id = %job.id, "File deleted");

    Ok(Json(FileDeleted {
        id: job.id,
        deleted: true,
    }))
}
