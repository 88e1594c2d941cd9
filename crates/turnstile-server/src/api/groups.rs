//! Access group administration endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use turnstile_core::{Event, Group, GroupId, NewGroup};

use crate::api::blocking;
use crate::api::error::{ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the groups router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_groups).post(add_group).put(set_group))
        .route("/{id}", delete(remove_group))
        .route("/{id}/events", get(group_events))
}

/// List groups.
#[utoipa::path(
    get,
    path = "/api/groups",
    tag = "groups",
    operation_id = "listGroups",
    summary = "List access groups",
    responses(
        (status = 200, description = "All groups, ordered by id", body = Vec<Group>),
        (status = 503, description = "Storage unavailable, retry", body = ErrorResponse)
    )
)]
pub async fn list_groups(State(state): State<SharedState>) -> ApiResult<Json<Vec<Group>>> {
    Ok(Json(blocking(&state, |state| state.admin.groups()).await?))
}

/// Create a group.
#[utoipa::path(
    post,
    path = "/api/groups",
    tag = "groups",
    operation_id = "addGroup",
    summary = "Create an access group",
    request_body = NewGroup,
    responses(
        (status = 201, description = "Group created", body = Group),
        (status = 409, description = "Name already taken", body = ErrorResponse)
    )
)]
pub async fn add_group(
    State(state): State<SharedState>,
    Json(request): Json<NewGroup>,
) -> ApiResult<(StatusCode, Json<Group>)> {
    let group = blocking(&state, move |state| state.admin.add_group(request)).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// Create or replace a group by name.
#[utoipa::path(
    put,
    path = "/api/groups",
    tag = "groups",
    operation_id = "setGroup",
    summary = "Create or replace an access group",
    description = "Groups are matched by name. An existing group keeps its id; \
        a new one gets the next free id.",
    request_body = NewGroup,
    responses(
        (status = 200, description = "Group stored", body = Group),
        (status = 503, description = "Storage unavailable, retry", body = ErrorResponse)
    )
)]
pub async fn set_group(
    State(state): State<SharedState>,
    Json(request): Json<NewGroup>,
) -> ApiResult<Json<Group>> {
    Ok(Json(
        blocking(&state, move |state| state.admin.set_group(request)).await?,
    ))
}

/// Delete a group.
#[utoipa::path(
    delete,
    path = "/api/groups/{id}",
    tag = "groups",
    operation_id = "removeGroup",
    summary = "Delete an access group",
    params(("id" = i64, Path, description = "Group id")),
    responses(
        (status = 204, description = "Group deleted"),
        (status = 404, description = "Unknown group", body = ErrorResponse)
    )
)]
pub async fn remove_group(
    State(state): State<SharedState>,
    Path(id): Path<GroupId>,
) -> ApiResult<StatusCode> {
    blocking(&state, move |state| state.admin.remove_group(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the events a group covers.
#[utoipa::path(
    get,
    path = "/api/groups/{id}/events",
    tag = "groups",
    operation_id = "listGroupEvents",
    summary = "List events covered by a group",
    description = "Every event at the group's building outside its excluded halls, \
        ordered by scheduled time. The access window is not applied.",
    params(("id" = i64, Path, description = "Group id")),
    responses(
        (status = 200, description = "Covered events", body = Vec<Event>),
        (status = 404, description = "Unknown group", body = ErrorResponse),
        (status = 503, description = "Storage unavailable, retry", body = ErrorResponse)
    )
)]
pub async fn group_events(
    State(state): State<SharedState>,
    Path(id): Path<GroupId>,
) -> ApiResult<Json<Vec<Event>>> {
    Ok(Json(
        blocking(&state, move |state| state.validator.scope().group_events(id)).await?,
    ))
}
