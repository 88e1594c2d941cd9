//! End-to-end API tests against the real router over an in-memory store.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{TimeDelta, Utc};
use serde_json::{json, Value};
use turnstile_core::{Clock, Config, FileStorage, ManualClock, MemoryStorage, Storage};
use turnstile_server::api::create_router;
use turnstile_server::state::AppState;

struct Harness {
    server: TestServer,
    clock: Arc<ManualClock>,
}

fn harness_with(storage: Arc<dyn Storage>) -> Harness {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let mut config = Config::default();
    config.storage.memory = true;
    let state =
        AppState::with_storage(config, storage, Arc::clone(&clock) as Arc<dyn Clock>).unwrap();
    Harness {
        server: TestServer::new(create_router(state)).unwrap(),
        clock,
    }
}

fn harness() -> Harness {
    harness_with(Arc::new(MemoryStorage::new()))
}

/// A group for building 603, one terminal in it, and one open event with a
/// single ticket `0001`.
async fn seed(h: &Harness) {
    h.server
        .post("/api/groups")
        .json(&json!({"name": "Main", "building_id": 603}))
        .await
        .assert_status(StatusCode::CREATED);
    h.server
        .post("/api/terminals")
        .json(&json!({"name": "North gate", "groups": [1]}))
        .await
        .assert_status(StatusCode::CREATED);
    h.server
        .post("/api/catalog/events")
        .json(&json!({
            "event": {
                "id": 10,
                "title": "Swan Lake",
                "scheduled_at": h.clock.now(),
                "venue_id": 603,
                "hall_id": 1
            },
            "tickets": [
                {"ticket_id": 1, "event_id": 10, "barcode": "0001", "sector": "A", "price": 1500.0}
            ],
            "source": "box-office"
        }))
        .await
        .assert_status_ok();
}

async fn scan(h: &Harness, barcode: &str, direction: &str) -> Value {
    let response = h
        .server
        .post("/api/scan")
        .json(&json!({"barcode": barcode, "terminal_id": 1, "direction": direction}))
        .await;
    response.assert_status_ok();
    response.json()
}

#[tokio::test]
async fn test_health() {
    let h = harness();
    let response = h.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ok");
}

#[tokio::test]
async fn test_entry_reentry_exit_cycle() {
    let h = harness();
    seed(&h).await;

    let first = scan(&h, "0001", "entry").await;
    assert_eq!(first["result"], "ACCEPT");
    assert_eq!(first["entry"], true);
    assert_eq!(first["ticket"]["sector"], "A");

    let again = scan(&h, "0001", "entry").await;
    assert_eq!(again["result"], "REENTRY");

    h.clock.advance(TimeDelta::seconds(30));
    let exit = scan(&h, "0001", "exit").await;
    assert_eq!(exit["result"], "ACCEPT");
    assert_eq!(exit["exit"], true);
    assert_eq!(exit["last_action"]["direction"], "entry");
}

#[tokio::test]
async fn test_unknown_barcode_is_not_found() {
    let h = harness();
    seed(&h).await;

    let outcome = scan(&h, "9999", "entry").await;
    assert_eq!(outcome["result"], "NOT_FOUND");
    assert_eq!(outcome["barcode"], "9999");
    assert!(outcome["ticket"].is_null());

    let history: Value = h.server.get("/api/tickets/9999/history").await.json();
    assert_eq!(history["entries"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_invalid_direction_is_bad_request() {
    let h = harness();
    seed(&h).await;

    let response = h
        .server
        .post("/api/scan")
        .json(&json!({"barcode": "0001", "terminal_id": 1, "direction": "sideways"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "invalid_direction");
}

#[tokio::test]
async fn test_unknown_terminal_is_not_found() {
    let h = harness();
    seed(&h).await;

    let response = h
        .server
        .post("/api/scan")
        .json(&json!({"barcode": "0001", "terminal_id": 42, "direction": "entry"}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "terminal_not_found");
}

#[tokio::test]
async fn test_check_does_not_record() {
    let h = harness();
    seed(&h).await;

    let response = h
        .server
        .get("/api/scan/check")
        .add_query_param("barcode", "0001")
        .add_query_param("terminal_id", 1)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["result"], "ACCEPT");

    let history: Value = h.server.get("/api/tickets/0001/history").await.json();
    assert_eq!(history["entries"].as_array().unwrap().len(), 0);
    assert_eq!(history["event"]["id"], 10);
}

#[tokio::test]
async fn test_history_lists_decisions_with_terminal_name() {
    let h = harness();
    seed(&h).await;

    scan(&h, "0001", "entry").await;
    h.clock.advance(TimeDelta::seconds(1));
    scan(&h, "0001", "exit").await;

    let history: Value = h.server.get("/api/tickets/0001/history").await.json();
    let entries = history["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["record"]["result"], "ACCEPT");
    assert_eq!(entries[1]["record"]["result"], "REENTRY");
    assert_eq!(entries[0]["terminal_name"], "North gate");
}

#[tokio::test]
async fn test_master_key_added_over_api_is_live() {
    let h = harness();
    seed(&h).await;

    h.server
        .post("/api/master-keys")
        .json(&json!({"barcode": "STAFF-1", "title": "Security"}))
        .await
        .assert_status(StatusCode::CREATED);
    h.server
        .post("/api/master-keys")
        .json(&json!({"barcode": "STAFF-1"}))
        .await
        .assert_status(StatusCode::CONFLICT);

    let outcome = scan(&h, "STAFF-1", "exit").await;
    assert_eq!(outcome["result"], "ACCEPT");
    assert_eq!(outcome["master_key"], true);

    let reload: Value = h.server.post("/api/master-keys/reload").await.json();
    assert_eq!(reload["loaded"], 1);
}

#[tokio::test]
async fn test_terminal_and_group_administration() {
    let h = harness();
    seed(&h).await;

    h.server
        .post("/api/terminals")
        .json(&json!({"name": "North gate"}))
        .await
        .assert_status(StatusCode::CONFLICT);

    let created: Value = h.server.get("/api/terminals/1").await.json();
    let updated: Value = h
        .server
        .put("/api/terminals/1")
        .json(&json!({"name": "North gate A", "groups": [1, 2]}))
        .await
        .json();
    assert_eq!(updated["secret"], created["secret"]);
    assert_eq!(updated["groups"], json!([1, 2]));

    h.server
        .put("/api/terminals/7")
        .json(&json!({"name": "Ghost"}))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let group: Value = h
        .server
        .put("/api/groups")
        .json(&json!({"name": "Main", "building_id": 603, "exclude_halls": [1]}))
        .await
        .json();
    assert_eq!(group["id"], 1);

    // hall 1 is now excluded, so the ticket falls out of scope
    let outcome = scan(&h, "0001", "entry").await;
    assert_eq!(outcome["result"], "NOT_FOUND");

    h.server
        .delete("/api/groups/1")
        .await
        .assert_status(StatusCode::NO_CONTENT);
    h.server
        .delete("/api/groups/1")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let groups: Value = h.server.get("/api/groups").await.json();
    assert!(groups.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_group_events_include_events_outside_the_window() {
    let h = harness();
    seed(&h).await;
    h.server
        .post("/api/catalog/events")
        .json(&json!({
            "event": {
                "id": 11,
                "title": "Giselle",
                "scheduled_at": h.clock.now() + TimeDelta::days(3),
                "venue_id": 603,
                "hall_id": 2
            },
            "tickets": [
                {
                    "ticket_id": 2,
                    "event_id": 11,
                    "barcode": "4601234/567+89",
                    "sector": "B",
                    "price": 900.0
                }
            ],
            "source": "box-office"
        }))
        .await
        .assert_status_ok();

    let events: Value = h.server.get("/api/groups/1/events").await.json();
    let ids: Vec<i64> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![10, 11]);

    // listed, but not yet admissible
    let outcome = scan(&h, "4601234/567+89", "entry").await;
    assert_eq!(outcome["result"], "NOT_FOUND");
    h.clock.advance(TimeDelta::days(3));
    let outcome = scan(&h, "4601234/567+89", "entry").await;
    assert_eq!(outcome["result"], "ACCEPT");

    h.server
        .get("/api/groups/9/events")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_maintenance_listing() {
    let h = harness();
    seed(&h).await;

    let events: Value = h
        .server
        .get("/api/catalog/maintenance")
        .add_query_param("delta_secs", 3600)
        .await
        .json();
    assert_eq!(events.as_array().unwrap().len(), 1);
    assert_eq!(events[0]["tickets_cached"], 1);
}

#[tokio::test]
async fn test_file_storage_keeps_ledger_between_restarts() {
    let dir = tempfile::tempdir().unwrap();
    {
        let h = harness_with(Arc::new(FileStorage::open(dir.path()).unwrap()));
        seed(&h).await;
        assert_eq!(scan(&h, "0001", "entry").await["result"], "ACCEPT");
    }

    let h = harness_with(Arc::new(FileStorage::open(dir.path()).unwrap()));
    let history: Value = h.server.get("/api/tickets/0001/history").await.json();
    assert_eq!(history["entries"].as_array().unwrap().len(), 1);
    assert_eq!(history["ticket"]["barcode"], "0001");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let h = harness();
    let response = h.server.get("/api/openapi.json").await;
    response.assert_status_ok();
    assert!(response.json::<Value>()["paths"]["/api/scan"].is_object());
}
