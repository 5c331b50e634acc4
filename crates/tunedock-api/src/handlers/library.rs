use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tunedock_core::models::{LibraryStats, LibraryView};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct FilesQuery {
    /// Restrict the listing to a single folder.
    #[serde(default)]
    pub folder: Option<String>,
}

#[utoipa::path(
    get,
    path = "/files",
    tag = "library",
    params(FilesQuery),
    responses(
        (status = 200, description = "Completed tracks grouped by folder", body = LibraryView),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(folder = ?query.folder, operation = "list_files"))]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilesQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let jobs = state.metadata.list_completed().await?;
    let view = LibraryView::build(jobs, query.folder.as_deref());
    Ok(Json(view))
}

#[utoipa::path(
    get,
    path = "/stats",
    tag = "library",
    responses(
        (status = 200, description = "Whole-library counters", body = LibraryStats),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "get_stats"))]
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let jobs = state.metadata.list_all().await?;
    Ok(Json(LibraryStats::collect(&jobs)))
}
