//! End-to-end tests of the typed client against a real bridge service.
//!
//! The service runs in-process with temp-directory stores; no SQL Server is
//! involved.

use bridge_client::{BridgeClient, BridgeError};
use bridge_service::state::AppState;
use bridge_service::stores::{CredentialStore, SessionStore};
use common::config::AppConfig;
use common::models::SaveCredentialRequest;
use tokio::net::TcpListener;

async fn start_bridge() -> (BridgeClient, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = AppConfig::load_with_service("bridge-service-test");
    let state = AppState::with_stores(
        config,
        CredentialStore::new(dir.path().join("credentials.json")),
        SessionStore::new(dir.path().join("session.json")),
    );
    let router = bridge_service::create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (BridgeClient::new(format!("http://{}", addr)), dir)
}

#[tokio::test]
async fn credentials_round_trip_through_typed_client() {
    let (client, _dir) = start_bridge().await;

    assert!(client.load_credentials().await.unwrap().is_empty());

    let profile = client
        .save_credentials(&SaveCredentialRequest {
            name: Some("dev box".into()),
            server: "localhost".into(),
            username: "sa".into(),
            password: "pw".into(),
        })
        .await
        .unwrap();
    assert_eq!(profile.name, "dev box");

    let profiles = client.load_credentials().await.unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].password, "pw");

    assert!(client.delete_credentials(&profile.id).await.unwrap());
    assert!(client.load_credentials().await.unwrap().is_empty());
}

#[tokio::test]
async fn session_lifecycle_without_server() {
    let (client, _dir) = start_bridge().await;

    assert!(client.load_session().await.unwrap().is_none());
    assert!(client.disconnect().await.unwrap());
}

#[tokio::test]
async fn failure_envelopes_become_typed_errors() {
    let (client, _dir) = start_bridge().await;

    let err = client.list_databases().await.unwrap_err();
    match err {
        BridgeError::Bridge { code, message } => {
            assert_eq!(code, "NO_ACTIVE_CONNECTION");
            assert_eq!(message, "No active connection");
        }
        other => panic!("expected bridge error, got {other:?}"),
    }
}

#[tokio::test]
async fn artifacts_are_written_client_side() {
    let (client, dir) = start_bridge().await;

    let path = dir.path().join("export.csv");
    client.save_artifact(&path, "id,name\n1,Ada\n").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "id,name\n1,Ada\n");
}
