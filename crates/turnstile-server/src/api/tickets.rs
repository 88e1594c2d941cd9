//! Ticket history endpoint.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use turnstile_core::TicketHistory;

use crate::api::blocking;
use crate::api::error::{ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the tickets router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/{barcode}/history", get(get_ticket_history))
}

/// Get everything recorded for a barcode.
#[utoipa::path(
    get,
    path = "/api/tickets/{barcode}/history",
    tag = "tickets",
    operation_id = "getTicketHistory",
    summary = "Get ticket history",
    description = "Returns the ticket and event for a barcode, if known, and every \
        recorded scan decision for it across all events, oldest first, with the \
        name of the terminal that made it.",
    params(
        ("barcode" = String, Path, description = "Ticket barcode", example = "000000000017")
    ),
    responses(
        (status = 200, description = "History retrieved", body = TicketHistory),
        (status = 503, description = "Storage unavailable, retry", body = ErrorResponse)
    )
)]
pub async fn get_ticket_history(
    State(state): State<SharedState>,
    Path(barcode): Path<String>,
) -> ApiResult<Json<TicketHistory>> {
    let history = blocking(&state, move |state| {
        state.validator.ticket_history(&barcode)
    })
    .await?;
    Ok(Json(history))
}
