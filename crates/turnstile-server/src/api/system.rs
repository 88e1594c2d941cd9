//! System status endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::SharedState;

/// Creates the system router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/status", get(get_status))
}

/// System status response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "version": "0.1.0",
    "uptime_secs": 3600,
    "storage": "file",
    "master_keys": 4,
    "production": true
}))]
pub struct SystemStatusResponse {
    /// Server version.
    #[schema(example = "0.1.0")]
    pub version: String,

    /// Server uptime in seconds.
    #[schema(example = 3600)]
    pub uptime_secs: u64,

    /// Storage backend: `memory` or `file`.
    #[schema(example = "file")]
    pub storage: String,

    /// Number of live master keys.
    #[schema(example = 4)]
    pub master_keys: usize,

    /// Whether production logging is active.
    pub production: bool,
}

/// Get system status.
#[utoipa::path(
    get,
    path = "/api/system/status",
    tag = "system",
    operation_id = "getSystemStatus",
    summary = "Get system status",
    description = "Returns the server version, uptime, storage backend and the \
        size of the live master-key set.",
    responses(
        (status = 200, description = "System status retrieved", body = SystemStatusResponse)
    )
)]
pub async fn get_status(State(state): State<SharedState>) -> Json<SystemStatusResponse> {
    Json(SystemStatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        storage: if state.config.storage.memory { "memory" } else { "file" }.to_string(),
        master_keys: state.master_keys.len(),
        production: state.config.server.production,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_status_response_serialization() {
        let response = SystemStatusResponse {
            version: "0.1.0".to_string(),
            uptime_secs: 3600,
            storage: "memory".to_string(),
            master_keys: 0,
            production: false,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"storage\":\"memory\""));
    }
}
