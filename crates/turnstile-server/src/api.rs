//! HTTP API routes and handlers.
//!
//! This module contains all HTTP endpoint implementations organized by domain:
//! - `scan` - Checkpoint scanning (register and peek)
//! - `tickets` - Ticket history lookup
//! - `terminals` - Terminal administration
//! - `groups` - Access group administration
//! - `master_keys` - Master key administration
//! - `catalog` - Upstream feed ingestion
//! - `health` - Service health checks
//! - `system` - Runtime status
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::state::{AppState, SharedState};

pub mod catalog;
pub mod error;
pub mod groups;
pub mod health;
pub mod master_keys;
pub mod openapi;
pub mod scan;
pub mod system;
pub mod terminals;
pub mod tickets;

// Re-export commonly used types
pub use error::{ApiError, ApiResult, ErrorResponse};

// Re-export OpenAPI utilities for the gen-openapi binary
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                         - Health check
/// /api
/// ├── /scan                       - Register a scan (POST)
/// ├── /scan/check                 - Peek without recording (GET)
/// ├── /tickets/{barcode}/history  - Ticket and ledger history
/// ├── /terminals                  - Terminal administration
/// ├── /groups                     - Access group administration
/// ├── /master-keys                - Master key administration
/// ├── /catalog                    - Upstream feed ingestion
/// ├── /system                     - Runtime status
/// └── /openapi.json               - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .nest("/scan", scan::router())
                .nest("/tickets", tickets::router())
                .nest("/terminals", terminals::router())
                .nest("/groups", groups::router())
                .nest("/master-keys", master_keys::router())
                .nest("/catalog", catalog::router())
                .nest("/system", system::router())
                .route("/openapi.json", get(openapi::get_openapi_spec)),
        )
        .with_state(state)
}

/// Run a synchronous engine call on the blocking pool.
///
/// Storage backends may touch the disk, so handlers never call them on an
/// async worker thread.
pub(crate) async fn blocking<T, F>(state: &SharedState, f: F) -> ApiResult<T>
where
    F: FnOnce(&AppState) -> turnstile_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    Ok(tokio::task::spawn_blocking(move || f(&state)).await??)
}
