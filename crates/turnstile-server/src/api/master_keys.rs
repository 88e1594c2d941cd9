//! Master key administration endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use turnstile_core::MasterKey;
use utoipa::ToSchema;

use crate::api::blocking;
use crate::api::error::{ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the master keys router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(add_master_key))
        .route("/reload", post(reload_master_keys))
}

/// Response after reloading master keys.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "loaded": 12 }))]
pub struct ReloadResponse {
    /// Number of keys now live.
    #[schema(example = 12)]
    pub loaded: usize,
}

/// Register a master key.
#[utoipa::path(
    post,
    path = "/api/master-keys",
    tag = "master-keys",
    operation_id = "addMasterKey",
    summary = "Register a master key",
    description = "Stores the key and makes it valid at every terminal immediately.",
    request_body = MasterKey,
    responses(
        (status = 201, description = "Master key added", body = MasterKey),
        (status = 400, description = "Invalid barcode", body = ErrorResponse),
        (status = 409, description = "Already registered", body = ErrorResponse)
    )
)]
pub async fn add_master_key(
    State(state): State<SharedState>,
    Json(request): Json<MasterKey>,
) -> ApiResult<(StatusCode, Json<MasterKey>)> {
    let key = blocking(&state, move |state| state.admin.add_master_key(request)).await?;
    Ok((StatusCode::CREATED, Json(key)))
}

/// Reload master keys from storage.
#[utoipa::path(
    post,
    path = "/api/master-keys/reload",
    tag = "master-keys",
    operation_id = "reloadMasterKeys",
    summary = "Reload master keys",
    description = "Replaces the live master-key set with the stored one. On \
        failure the previous set stays live.",
    responses(
        (status = 200, description = "Keys reloaded", body = ReloadResponse),
        (status = 503, description = "Storage unavailable, retry", body = ErrorResponse)
    )
)]
pub async fn reload_master_keys(
    State(state): State<SharedState>,
) -> ApiResult<Json<ReloadResponse>> {
    let loaded = blocking(&state, |state| state.admin.reload_master_keys()).await?;
    Ok(Json(ReloadResponse { loaded }))
}
