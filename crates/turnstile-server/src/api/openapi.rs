//! OpenAPI specification generation for the turnstile API.
//!
//! The document is served at `/api/openapi.json` and written to the
//! workspace root by the `gen-openapi` binary for client generation.

use axum::Json;
use turnstile_core::{
    Action, Direction, EntryRecord, Event, Group, HealthResponse, HistoryEntry, MasterKey,
    NewGroup, NewTerminal, ResultCode, ScanOutcome, SyncBatch, Terminal, Ticket, TicketHistory,
};
use utoipa::OpenApi;

use super::error::ErrorResponse;
use super::master_keys::ReloadResponse;
use super::scan::ScanRequest;
use super::system::SystemStatusResponse;

/// Serve the OpenAPI specification as JSON.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as a pretty-printed string.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for turnstile.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "turnstile API",
        version = "0.1.0",
        description = r#"
# turnstile API

turnstile validates tickets at venue checkpoints and enforces anti-passback.

## Scanning

Terminals post every barcode they read to **registerScan** with the direction
the holder is walking. The result is one of:

- `ACCEPT`: open the gate. `entry`/`exit` tell which way the ticket was allowed.
- `REENTRY`: refused by anti-passback. The ticket is already on that side, was
  scanned a moment ago elsewhere, or its reentry window has closed.
- `NOT_FOUND`: the barcode is not a ticket for any event this terminal serves
  right now.

Refusals are normal `200` responses. A `503` means storage failed and the same
request may be retried.

## Administration

Terminals belong to access groups; a group names a building and the halls it
excludes. Master keys are accepted at every terminal without any checks.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local turnstile server")
    ),
    tags(
        (name = "system", description = "Health checks and system status"),
        (name = "scan", description = "Checkpoint scanning"),
        (name = "tickets", description = "Ticket history"),
        (name = "terminals", description = "Scanning terminal administration"),
        (name = "groups", description = "Access group administration"),
        (name = "master-keys", description = "Master key administration"),
        (name = "catalog", description = "Upstream ticketing feed ingestion")
    ),
    paths(
        super::health::health_check,
        super::system::get_status,
        super::scan::register_scan,
        super::scan::check_scan,
        super::tickets::get_ticket_history,
        super::terminals::list_terminals,
        super::terminals::get_terminal,
        super::terminals::add_terminal,
        super::terminals::update_terminal,
        super::groups::list_groups,
        super::groups::add_group,
        super::groups::set_group,
        super::groups::remove_group,
        super::groups::group_events,
        super::master_keys::add_master_key,
        super::master_keys::reload_master_keys,
        super::catalog::sync_event,
        super::catalog::maintenance_events,
    ),
    components(
        schemas(
            // Error types
            ErrorResponse,
            // System types
            HealthResponse,
            SystemStatusResponse,
            // Scan types
            ScanRequest,
            ScanOutcome,
            ResultCode,
            Direction,
            Action,
            // Catalog types
            Ticket,
            Event,
            SyncBatch,
            // History types
            EntryRecord,
            HistoryEntry,
            TicketHistory,
            // Administration types
            Terminal,
            NewTerminal,
            Group,
            NewGroup,
            MasterKey,
            ReloadResponse,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "turnstile API");
        assert!(spec.paths.paths.contains_key("/api/scan"));
        assert!(spec.paths.paths.contains_key("/api/tickets/{barcode}/history"));
        assert!(spec.paths.paths.contains_key("/api/groups/{id}/events"));
    }

    #[test]
    fn test_openapi_json_serialization() {
        let json = get_openapi_json().unwrap();
        assert!(json.contains("\"openapi\":"));
        assert!(json.contains("\"turnstile API\""));
        assert!(json.contains("ScanOutcome"));
    }
}
