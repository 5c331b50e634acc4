use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::identity::CallerIdentity;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tunedock_core::models::FolderSummary;
use tunedock_core::sanitize::sanitize_folder;
use tunedock_core::AppError;
use tunedock_storage::keys;
use utoipa::ToSchema;
use validator::Validate;

#[utoipa::path(
    get,
    path = "/folders",
    tag = "library",
    responses(
        (status = 200, description = "Folder names with completed-track counts", body = Vec<FolderSummary>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "list_folders"))]
pub async fn list_folders(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let jobs = state.metadata.list_completed().await?;
    Ok(Json(FolderSummary::summarize(&jobs)))
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateFolderRequest {
    #[validate(length(
        min = 1,
        max = 64,
        message = "Folder name must be between 1 and 64 characters"
    ))]
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FolderCreated {
    pub name: String,
}

#[utoipa::path(
    post,
    path = "/folders",
    tag = "library",
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Folder created", body = FolderCreated),
        (status = 400, description = "Invalid folder name", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, payload),
    fields(requester_id = %caller.0, operation = "create_folder")
)]
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
    ValidatedJson(payload): ValidatedJson<CreateFolderRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Some(name) = sanitize_folder(Some(&payload.name)) else {
        return Err(AppError::Validation("Folder name has no usable characters".to_string()).into());
    };

    if !state.identity.is_owner(&caller.0).await? {
        return Err(AppError::Authorization("Only the owner can manage folders".to_string()).into());
    }

    // Folders are derived from completed jobs; the only material side effect
    // of creation is the scratch subtree jobs will download into.
    let dir = keys::scratch_dir(&state.scratch_root, &caller.0, Some(&name));
    tokio::fs::create_dir_all(&dir).await.map_err(AppError::from)?;

    tracing::info!(folder = %name, "Folder created");

    Ok((StatusCode::CREATED, Json(FolderCreated { name })))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FolderDeleted {
    pub folder: String,
    /// Jobs whose artifact and record were both removed.
    pub deleted: usize,
    /// Jobs left in place because a deletion step failed.
    pub failed: usize,
}

#[utoipa::path(
    delete,
    path = "/folders/{name}",
    tag = "library",
    params(
        ("name" = String, Path, description = "Folder name")
    ),
    responses(
        (status = 200, description = "Deletion outcome per job", body = FolderDeleted),
        (status = 400, description = "Invalid folder name", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state),
    fields(requester_id = %caller.0, folder = %name, operation = "delete_folder")
)]
pub async fn delete_folder(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Some(name) = sanitize_folder(Some(&name)) else {
        return Err(AppError::Validation("Folder name has no usable characters".to_string()).into());
    };

    if !state.identity.is_owner(&caller.0).await? {
        return Err(AppError::Authorization("Only the owner can manage folders".to_string()).into());
    }

    let jobs = state.metadata.list_in_folder(&name).await?;
    let mut deleted = 0usize;
    let mut failed = 0usize;

    for job in jobs {
        // Durable artifact first; jobs that never completed have nothing
        // stored and skip straight to the record.
        if let Some(key) = job.storage_key.as_deref() {
            if let Err(e) = state.objects.delete(key).await {
                tracing::warn!(job_id = %job.id, key = %key, error = %e, "Artifact deletion failed");
                failed += 1;
                continue;
            }
        }
        match state.metadata.delete(job.id).await {
            Ok(true) => deleted += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "Job record deletion failed");
                failed += 1;
            }
        }
    }

    // Sweep the folder's scratch subtree; a missing directory is fine.
    let scratch = keys::scratch_dir(&state.scratch_root, &caller.0, Some(&name));
    if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!(path = %scratch.display(), error = %e, "Scratch directory not removed");
        }
    }

    tracing::info!(folder = %name, deleted, failed, "Folder deletion finished");

    Ok(Json(FolderDeleted {
        folder: name,
        deleted,
        failed,
    }))
}
