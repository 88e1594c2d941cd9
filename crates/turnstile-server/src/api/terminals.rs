//! Terminal administration endpoints.
//!
//! Terminals are the scanning devices at the gates. Each belongs to zero or
//! more access groups, which decide the events it may admit to. A secret is
//! generated when the terminal is registered and never changes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use turnstile_core::{NewTerminal, Terminal, TerminalId};

use crate::api::blocking;
use crate::api::error::{ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the terminals router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_terminals).post(add_terminal))
        .route("/{id}", put(update_terminal).get(get_terminal))
}

/// List terminals.
#[utoipa::path(
    get,
    path = "/api/terminals",
    tag = "terminals",
    operation_id = "listTerminals",
    summary = "List terminals",
    responses(
        (status = 200, description = "All terminals, ordered by id", body = Vec<Terminal>),
        (status = 503, description = "Storage unavailable, retry", body = ErrorResponse)
    )
)]
pub async fn list_terminals(State(state): State<SharedState>) -> ApiResult<Json<Vec<Terminal>>> {
    Ok(Json(blocking(&state, |state| state.admin.terminals()).await?))
}

/// Get one terminal.
#[utoipa::path(
    get,
    path = "/api/terminals/{id}",
    tag = "terminals",
    operation_id = "getTerminal",
    summary = "Get a terminal",
    params(("id" = i64, Path, description = "Terminal id")),
    responses(
        (status = 200, description = "Terminal found", body = Terminal),
        (status = 404, description = "Unknown terminal", body = ErrorResponse)
    )
)]
pub async fn get_terminal(
    State(state): State<SharedState>,
    Path(id): Path<TerminalId>,
) -> ApiResult<Json<Terminal>> {
    Ok(Json(blocking(&state, move |state| state.admin.terminal(id)).await?))
}

/// Register a terminal.
#[utoipa::path(
    post,
    path = "/api/terminals",
    tag = "terminals",
    operation_id = "addTerminal",
    summary = "Register a terminal",
    description = "Creates a terminal with the next free id and a freshly \
        generated secret.",
    request_body = NewTerminal,
    responses(
        (status = 201, description = "Terminal created", body = Terminal),
        (status = 409, description = "Name already taken", body = ErrorResponse)
    )
)]
pub async fn add_terminal(
    State(state): State<SharedState>,
    Json(request): Json<NewTerminal>,
) -> ApiResult<(StatusCode, Json<Terminal>)> {
    let terminal = blocking(&state, move |state| state.admin.add_terminal(request)).await?;
    Ok((StatusCode::CREATED, Json(terminal)))
}

/// Update a terminal's name and groups.
#[utoipa::path(
    put,
    path = "/api/terminals/{id}",
    tag = "terminals",
    operation_id = "updateTerminal",
    summary = "Update a terminal",
    description = "Replaces the name and group list. The secret is kept.",
    params(("id" = i64, Path, description = "Terminal id")),
    request_body = NewTerminal,
    responses(
        (status = 200, description = "Terminal updated", body = Terminal),
        (status = 404, description = "Unknown terminal", body = ErrorResponse),
        (status = 409, description = "Name taken by another terminal", body = ErrorResponse)
    )
)]
pub async fn update_terminal(
    State(state): State<SharedState>,
    Path(id): Path<TerminalId>,
    Json(request): Json<NewTerminal>,
) -> ApiResult<Json<Terminal>> {
    let terminal =
        blocking(&state, move |state| state.admin.update_terminal(id, request)).await?;
    Ok(Json(terminal))
}
