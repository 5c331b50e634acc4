use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::identity::{admin_token_matches, CallerIdentity};
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tunedock_core::sanitize::resolve_identity;
use tunedock_core::AppError;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnerResponse {
    pub identity: String,
    pub is_owner: bool,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ReassignOwnerRequest {
    /// Identity to install as the new owner.
    #[validate(length(
        min = 1,
        max = 64,
        message = "Identity must be between 1 and 64 characters"
    ))]
    pub identity: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReassigned {
    pub identity: String,
}

#[utoipa::path(
    get,
    path = "/owner",
    tag = "owner",
    responses(
        (status = 200, description = "Persisted owner identity", body = OwnerResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(requester_id = %caller.0, operation = "get_owner"))]
pub async fn get_owner(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
) -> Result<impl IntoResponse, HttpAppError> {
    // On a fresh install the first caller to ask becomes the owner.
    let owner = state.identity.install_if_absent(&caller.0).await?;
    let is_owner = owner == caller.0;

    Ok(Json(OwnerResponse {
        identity: owner,
        is_owner,
    }))
}

#[utoipa::path(
    post,
    path = "/owner",
    tag = "owner",
    request_body = ReassignOwnerRequest,
    responses(
        (status = 200, description = "Owner identity replaced", body = OwnerReassigned),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 403, description = "Missing or wrong admin token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, headers, payload), fields(operation = "reassign_owner"))]
pub async fn reassign_owner(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<ReassignOwnerRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    if !admin_token_matches(state.admin_token.as_deref(), &headers) {
        return Err(AppError::Authorization(
            "Owner reassignment requires a valid admin token".to_string(),
        )
        .into());
    }

    let identity = resolve_identity(Some(&payload.identity));
    state.identity.reassign(&identity).await?;

    tracing::info!(identity = %identity, "Owner identity reassigned");

    Ok(Json(OwnerReassigned { identity }))
}
