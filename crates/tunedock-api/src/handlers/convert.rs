use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::identity::CallerIdentity;
use crate::state::AppState;
use crate::validation::validate_source_url;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tunedock_core::models::{BitrateTier, JobStatus, NewJob};
use tunedock_core::sanitize::sanitize_folder;
use tunedock_core::AppError;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    /// Source page or media URL to convert.
    #[validate(length(
        min = 1,
        max = 2048,
        message = "URL must be between 1 and 2048 characters"
    ))]
    pub url: String,
    /// Folder the finished track is filed under.
    #[serde(default)]
    #[validate(length(max = 64, message = "Folder name must be at most 64 characters"))]
    pub folder: Option<String>,
    /// Audio quality tier: "low" (default) or "high".
    #[serde(default)]
    pub bitrate_tier: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertAccepted {
    pub id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

#[utoipa::path(
    post,
    path = "/convert",
    tag = "jobs",
    request_body = ConvertRequest,
    responses(
        (status = 202, description = "Conversion accepted; poll /status/{id}", body = ConvertAccepted),
        (status = 400, description = "Invalid URL or request body", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 409, description = "URL already submitted", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, payload),
    fields(requester_id = %caller.0, operation = "convert")
)]
pub async fn convert(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
    ValidatedJson(payload): ValidatedJson<ConvertRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    validate_source_url(&payload.url).map_err(AppError::Validation)?;
    let url = payload.url.trim().to_string();
    let folder = sanitize_folder(payload.folder.as_deref());
    let bitrate_tier = BitrateTier::from_input(payload.bitrate_tier.as_deref());

    // The first caller to submit becomes the owner; everyone else is refused
    // before any state is written.
    if !state.identity.is_owner(&caller.0).await? {
        return Err(AppError::Authorization("Only the owner can add new songs".to_string()).into());
    }

    // One live job per source URL. Jobs that ended in Error do not block
    // resubmission.
    if let Some(existing) = state.metadata.find_conflict(&url).await? {
        return Err(AppError::Conflict {
            existing_id: existing.id,
            existing_status: existing.status,
        }
        .into());
    }

    let new_job = NewJob::new(caller.0.clone(), url, folder, bitrate_tier);
    let job = state.metadata.insert(&new_job).await?;

    tracing::info!(job_id = %job.id, folder = ?job.folder, "Conversion job accepted");

    if !state.orchestrator.spawn(job.clone()) {
        // A tracker collision here means another task already owns this id.
        tracing::warn!(job_id = %job.id, "Job id already claimed by a running task");
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(ConvertAccepted {
            id: job.id,
            status: job.status,
            folder: job.folder,
        }),
    ))
}
