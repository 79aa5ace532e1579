//! API integration tests for the bridge service.
//!
//! Everything here runs without a SQL Server: stores are backed by a temp
//! directory and database operations are exercised only for their failure
//! envelopes.

use bridge_service::state::AppState;
use bridge_service::stores::{CredentialStore, SessionStore};
use bridge_service::create_router;
use common::config::AppConfig;
use serde_json::{json, Value};
use tokio::net::TcpListener;

// =============================================================================
// Test Helpers
// =============================================================================

/// Create test state with stores in a temp directory.
fn create_test_state(dir: &tempfile::TempDir) -> AppState {
    let config = AppConfig::load_with_service("bridge-service-test");
    AppState::with_stores(
        config,
        CredentialStore::new(dir.path().join("credentials.json")),
        SessionStore::new(dir.path().join("session.json")),
    )
}

/// Start test server and return base URL.
async fn start_test_server() -> (String, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let state = create_test_state(&dir);
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{}", addr), dir)
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_reports_disconnected_state() {
    let (base_url, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/health", base_url))
        .send()
        .await
        .expect("health request failed");
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "bridge-service");
    assert_eq!(body["connected"], false);
    assert_eq!(body["pools"], 0);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (base_url, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api-docs/openapi.json", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert!(body["paths"]["/api/session/connect"].is_object());
    assert!(body["paths"]["/api/databases/{db}/tables/{table}/data"].is_object());
}

// =============================================================================
// Credentials
// =============================================================================

#[tokio::test]
async fn credentials_crud_round_trip() {
    let (base_url, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    // Initially empty
    let resp = client
        .get(format!("{}/api/credentials", base_url))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], json!([]));

    // Save one without a name: the display name is derived
    let resp = client
        .post(format!("{}/api/credentials", base_url))
        .json(&json!({
            "server": "localhost",
            "username": "sa",
            "password": "pw"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "localhost - sa");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    // The list now has it, password included
    let body: Value = client
        .get(format!("{}/api/credentials", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["password"], "pw");

    // Delete it
    let body: Value = client
        .delete(format!("{}/api/credentials/{}", base_url, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], true);

    // Deleting again removes nothing but still succeeds
    let body: Value = client
        .delete(format!("{}/api/credentials/{}", base_url, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], false);
}

#[tokio::test]
async fn credential_validation_failures_use_the_envelope() {
    let (base_url, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/credentials", base_url))
        .json(&json!({ "server": "", "username": "sa" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

// =============================================================================
// Session
// =============================================================================

#[tokio::test]
async fn session_is_empty_until_connected() {
    let (base_url, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let body: Value = client
        .get(format!("{}/api/session", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    assert!(body.get("data").is_none() || body["data"].is_null());
}

#[tokio::test]
async fn disconnect_without_connection_clears_nothing_but_succeeds() {
    let (base_url, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("{}/api/session/disconnect", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], true);
}

// =============================================================================
// Failure envelopes for database operations
// =============================================================================

#[tokio::test]
async fn database_operations_require_active_connection() {
    let (base_url, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/databases", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NO_ACTIVE_CONNECTION");
    assert_eq!(body["error"]["message"], "No active connection");

    // Lazy per-database pools are also gated on the active connection
    let resp = client
        .post(format!("{}/api/databases/inventory/tables/users/data", base_url))
        .json(&json!({ "page": 1, "page_size": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn create_database_rejects_bad_names_before_connecting() {
    let (base_url, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/databases", base_url))
        .json(&json!({ "name": "bad name; DROP" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn system_databases_cannot_be_deleted() {
    let (base_url, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    for name in ["master", "tempdb", "model", "msdb"] {
        let resp = client
            .delete(format!("{}/api/databases/{}", base_url, name))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "system database {name} must be refused");

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["message"], "Cannot delete system databases");
    }
}

#[tokio::test]
async fn import_rejects_invalid_payload_before_touching_the_pool() {
    let (base_url, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    // A CSV without data rows fails validation (before pool lookup)
    let resp = client
        .post(format!("{}/api/databases/shop/tables/users/import", base_url))
        .json(&json!({ "format": "csv", "payload": "id,name\n" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
