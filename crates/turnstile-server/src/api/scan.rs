//! Checkpoint scanning endpoints.
//!
//! A terminal posts every barcode it reads together with the direction the
//! holder is walking. The answer is always one of `ACCEPT`, `REENTRY` or
//! `NOT_FOUND`; refusals are regular `200` responses, only malformed
//! requests and storage failures are errors.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use turnstile_core::{Direction, ScanOutcome, TerminalId};
use utoipa::{IntoParams, ToSchema};

use crate::api::blocking;
use crate::api::error::{ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the scan router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(register_scan))
        .route("/check", get(check_scan))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// A barcode read at a terminal.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "barcode": "000000000017",
    "terminal_id": 1,
    "direction": "entry"
}))]
pub struct ScanRequest {
    /// Scanned barcode.
    #[schema(example = "000000000017")]
    pub barcode: String,

    /// Terminal that read it.
    #[schema(example = 1)]
    pub terminal_id: TerminalId,

    /// `entry` or `exit`. Anything else is rejected with `400`.
    #[schema(example = "entry")]
    pub direction: String,
}

/// Query parameters for a read-only check.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct CheckQuery {
    /// Barcode to look up.
    #[param(example = "000000000017")]
    pub barcode: String,

    /// Terminal whose scope to use.
    #[param(example = 1)]
    pub terminal_id: TerminalId,
}

// ============================================================================
// Handlers
// ============================================================================

/// Register a scan.
#[utoipa::path(
    post,
    path = "/api/scan",
    tag = "scan",
    operation_id = "registerScan",
    summary = "Register a scan",
    description = "Decides whether the ticket may pass in the requested direction \
        and records the decision. Master keys are always accepted. Tickets outside \
        the terminal's open events are NOT_FOUND and leave no record.",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Decision taken", body = ScanOutcome),
        (status = 400, description = "Invalid direction", body = ErrorResponse),
        (status = 404, description = "Unknown terminal", body = ErrorResponse),
        (status = 503, description = "Storage unavailable, retry", body = ErrorResponse)
    )
)]
pub async fn register_scan(
    State(state): State<SharedState>,
    Json(request): Json<ScanRequest>,
) -> ApiResult<Json<ScanOutcome>> {
    let direction: Direction = request.direction.parse()?;
    let outcome = blocking(&state, move |state| {
        let terminal = state.validator.terminal(request.terminal_id)?;
        state
            .validator
            .register(&request.barcode, &terminal, direction)
    })
    .await?;
    Ok(Json(outcome))
}

/// Check a barcode without recording anything.
#[utoipa::path(
    get,
    path = "/api/scan/check",
    tag = "scan",
    operation_id = "checkScan",
    summary = "Check a barcode",
    description = "Looks the ticket up in the terminal's open events and reports \
        which direction it may pass. Nothing is recorded and no lock is taken.",
    params(CheckQuery),
    responses(
        (status = 200, description = "Lookup result", body = ScanOutcome),
        (status = 404, description = "Unknown terminal", body = ErrorResponse),
        (status = 503, description = "Storage unavailable, retry", body = ErrorResponse)
    )
)]
pub async fn check_scan(
    State(state): State<SharedState>,
    Query(query): Query<CheckQuery>,
) -> ApiResult<Json<ScanOutcome>> {
    let outcome = blocking(&state, move |state| {
        let terminal = state.validator.terminal(query.terminal_id)?;
        state.validator.validate(&query.barcode, &terminal)
    })
    .await?;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_request_deserialization() {
        let json = r#"{"barcode": "0001", "terminal_id": 2, "direction": "exit"}"#;
        let request: ScanRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.terminal_id, 2);
        assert_eq!(request.direction.parse::<Direction>().unwrap(), Direction::Exit);
    }
}
