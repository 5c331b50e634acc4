use crate::error::{ErrorResponse, HttpAppError};
use crate::identity::CallerIdentity;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tunedock_core::models::JobResponse;
use tunedock_core::AppError;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/status/{id}",
    tag = "jobs",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job snapshot", body = JobResponse),
        (status = 404, description = "Job not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(job_id = %id, operation = "get_status"))]
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let job = state
        .metadata
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    Ok(Json(JobResponse::from(job)))
}

#[utoipa::path(
    get,
    path = "/status",
    tag = "jobs",
    responses(
        (status = 200, description = "Job snapshots visible to the caller", body = Vec<JobResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(requester_id = %caller.0, operation = "list_status"))]
pub async fn list_status(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
) -> Result<impl IntoResponse, HttpAppError> {
    // The owner sees every job; other callers only the ones they submitted.
    let jobs = if state.identity.is_owner(&caller.0).await? {
        state.metadata.list_all().await?
    } else {
        state.metadata.list_for_requester(&caller.0).await?
    };

    let snapshots: Vec<JobResponse> = jobs.into_iter().map(JobResponse::from).collect();
    Ok(Json(snapshots))
}
