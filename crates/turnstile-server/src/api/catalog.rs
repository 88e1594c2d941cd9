//! Upstream feed ingestion endpoints.
//!
//! The feed client pushes one event with its complete ticket list per call.
//! Tickets the feed no longer lists for that event and source are dropped.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::TimeDelta;
use serde::Deserialize;
use turnstile_core::{Event, SyncBatch};
use utoipa::IntoParams;

use crate::api::blocking;
use crate::api::error::{ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the catalog router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/events", post(sync_event))
        .route("/maintenance", get(maintenance_events))
}

/// Query parameters for the maintenance listing.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct MaintenanceQuery {
    /// Seconds to widen the access window by on both sides.
    #[param(example = 3600, minimum = 0)]
    #[serde(default)]
    pub delta_secs: u32,
}

/// Store one event and its tickets.
#[utoipa::path(
    post,
    path = "/api/catalog/events",
    tag = "catalog",
    operation_id = "syncEvent",
    summary = "Synchronize an event",
    description = "Upserts the event and its tickets, then removes tickets of the \
        same event and source that this batch no longer contains.",
    request_body = SyncBatch,
    responses(
        (status = 200, description = "Event stored with its ticket count", body = Event),
        (status = 503, description = "Storage unavailable, retry", body = ErrorResponse)
    )
)]
pub async fn sync_event(
    State(state): State<SharedState>,
    Json(batch): Json<SyncBatch>,
) -> ApiResult<Json<Event>> {
    let event = blocking(&state, move |state| {
        let now = state.validator.now();
        state.sync.apply(batch, now)
    })
    .await?;
    Ok(Json(event))
}

/// Events due for re-synchronization.
#[utoipa::path(
    get,
    path = "/api/catalog/maintenance",
    tag = "catalog",
    operation_id = "maintenanceEvents",
    summary = "List events due for re-sync",
    description = "Events scheduled inside the access window widened by \
        `delta_secs` on both sides.",
    params(MaintenanceQuery),
    responses(
        (status = 200, description = "Events in the widened window", body = Vec<Event>),
        (status = 503, description = "Storage unavailable, retry", body = ErrorResponse)
    )
)]
pub async fn maintenance_events(
    State(state): State<SharedState>,
    Query(query): Query<MaintenanceQuery>,
) -> ApiResult<Json<Vec<Event>>> {
    let delta = TimeDelta::seconds(i64::from(query.delta_secs));
    let events = blocking(&state, move |state| {
        let now = state.validator.now();
        state.sync.maintenance_window(now, delta)
    })
    .await?;
    Ok(Json(events))
}
