//! Typed client for the bridge service, used by the sandboxed UI process.
//!
//! Wraps every bridge operation in an async method, decodes the uniform
//! envelope, and implements the UI layer's retry policy for transient
//! connection failures. Export and dump artifacts are written to disk here,
//! on the UI side.

use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use common::models::{
    ColumnDescriptor, ConnectRequest, ConnectionProfile, CreateDatabaseRequest,
    CreateTableRequest, DatabaseEntry, DeleteRowRequest, DumpRequest, DumpResult, ExportArtifact,
    ExportFormat, ExportRequest, ImportRequest, ImportResult, InsertRowRequest, RelationEntry,
    RestoreRequest, RestoreResult, SaveCredentialRequest, SessionRecord, TableDataRequest,
    TableEntry, TablePage, UpdateCellRequest,
};

/// Retries applied on top of the initial attempt for transient failures.
const MAX_RETRIES: u32 = 2;

/// Client-side failure of a bridge operation.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The request never produced an envelope (process down, timeout, ...).
    #[error("bridge request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The host process returned a failure envelope.
    #[error("{message}")]
    Bridge {
        /// Stable error code from the envelope.
        code: String,
        /// Driver or validation message.
        message: String,
    },

    /// A success envelope arrived without the expected data.
    #[error("malformed bridge response")]
    MalformedResponse,

    /// Writing an artifact to disk failed.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Whether a failure is worth re-issuing the request for.
///
/// Matches the narrow set the UI retried: transport-level connection
/// problems, plus failure messages mentioning connection or timeout issues.
pub fn is_retryable(err: &BridgeError) -> bool {
    match err {
        BridgeError::Transport(e) => e.is_timeout() || e.is_connect(),
        BridgeError::Bridge { message, .. } => {
            let message = message.to_lowercase();
            message.contains("connection")
                || message.contains("timeout")
                || message.contains("econnreset")
        }
        _ => false,
    }
}

/// Backoff before retry `attempt` (1-based): 1s, 2s, ...
pub fn retry_delay(attempt: u32) -> Duration {
    Duration::from_secs(u64::from(attempt))
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default = "Option::default")]
    data: Option<T>,
    #[serde(default = "Option::default")]
    error: Option<EnvelopeError>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeError {
    code: String,
    message: String,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<Option<T>, BridgeError> {
        if self.success {
            Ok(self.data)
        } else {
            let error = self.error.ok_or(BridgeError::MalformedResponse)?;
            Err(BridgeError::Bridge {
                code: error.code,
                message: error.message,
            })
        }
    }
}

/// Async client for every bridge operation.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl BridgeClient {
    /// Creates a client for a bridge service at the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Option<T>, BridgeError> {
        let envelope: Envelope<T> = response.json().await?;
        envelope.into_data()
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, BridgeError> {
        let response = self.http_client.get(self.url(path)).send().await?;
        Self::decode(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<T>, BridgeError> {
        let response = self
            .http_client
            .post(self.url(path))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, BridgeError> {
        let response = self.http_client.post(self.url(path)).send().await?;
        Self::decode(response).await
    }

    async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<T>, BridgeError> {
        let response = self
            .http_client
            .patch(self.url(path))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, BridgeError> {
        let response = self.http_client.delete(self.url(path)).send().await?;
        Self::decode(response).await
    }

    async fn delete_with_body<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<T>, BridgeError> {
        let response = self
            .http_client
            .delete(self.url(path))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    // ============== Session ==============

    /// Connects to a server; the host records the active session.
    pub async fn connect(&self, req: &ConnectRequest) -> Result<SessionRecord, BridgeError> {
        self.post("/api/session/connect", req)
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    /// Disconnects and clears the persisted session.
    pub async fn disconnect(&self) -> Result<bool, BridgeError> {
        self.post_empty("/api/session/disconnect")
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    /// Loads the persisted session record, if any.
    pub async fn load_session(&self) -> Result<Option<SessionRecord>, BridgeError> {
        self.get("/api/session").await
    }

    /// Attempts to resume a session (the password must be re-entered on
    /// failure).
    pub async fn restore_session(
        &self,
        record: &SessionRecord,
    ) -> Result<SessionRecord, BridgeError> {
        self.post("/api/session/restore", record)
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    // ============== Credentials ==============

    /// Saves a connection profile.
    pub async fn save_credentials(
        &self,
        req: &SaveCredentialRequest,
    ) -> Result<ConnectionProfile, BridgeError> {
        self.post("/api/credentials", req)
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    /// Loads all saved connection profiles.
    pub async fn load_credentials(&self) -> Result<Vec<ConnectionProfile>, BridgeError> {
        self.get("/api/credentials")
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    /// Deletes a profile; returns whether anything was removed.
    pub async fn delete_credentials(&self, id: &str) -> Result<bool, BridgeError> {
        self.delete(&format!("/api/credentials/{id}"))
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    // ============== Databases ==============

    /// Lists user databases.
    pub async fn list_databases(&self) -> Result<Vec<DatabaseEntry>, BridgeError> {
        self.get("/api/databases")
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    /// Creates a database.
    pub async fn create_database(&self, name: &str) -> Result<String, BridgeError> {
        self.post(
            "/api/databases",
            &CreateDatabaseRequest {
                name: name.to_string(),
            },
        )
        .await?
        .ok_or(BridgeError::MalformedResponse)
    }

    /// Drops a database.
    pub async fn delete_database(&self, name: &str) -> Result<String, BridgeError> {
        self.delete(&format!("/api/databases/{name}"))
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    /// Opens (or reuses) the pool for a database.
    pub async fn open_database(&self, name: &str) -> Result<String, BridgeError> {
        self.post_empty(&format!("/api/databases/{name}/connect"))
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    // ============== Tables ==============

    /// Lists tables of a database.
    pub async fn list_tables(&self, db: &str) -> Result<Vec<TableEntry>, BridgeError> {
        self.get(&format!("/api/databases/{db}/tables"))
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    /// Creates a table.
    pub async fn create_table(
        &self,
        db: &str,
        req: &CreateTableRequest,
    ) -> Result<String, BridgeError> {
        self.post(&format!("/api/databases/{db}/tables"), req)
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    /// Drops a table.
    pub async fn delete_table(&self, db: &str, table: &str) -> Result<String, BridgeError> {
        self.delete(&format!("/api/databases/{db}/tables/{table}"))
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    /// Fetches the column structure of a table.
    pub async fn table_structure(
        &self,
        db: &str,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>, BridgeError> {
        self.get(&format!("/api/databases/{db}/tables/{table}/structure"))
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    /// Fetches the foreign keys held by a table.
    pub async fn table_relations(
        &self,
        db: &str,
        table: &str,
    ) -> Result<Vec<RelationEntry>, BridgeError> {
        self.get(&format!("/api/databases/{db}/tables/{table}/relations"))
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    // ============== Rows ==============

    /// Fetches one page of rows, retrying transient connection failures with
    /// backoff before giving up.
    pub async fn table_data(
        &self,
        db: &str,
        table: &str,
        req: &TableDataRequest,
    ) -> Result<TablePage, BridgeError> {
        let path = format!("/api/databases/{db}/tables/{table}/data");

        let mut attempt = 0u32;
        loop {
            let result = self
                .post(&path, req)
                .await
                .and_then(|data| data.ok_or(BridgeError::MalformedResponse));

            match result {
                Ok(page) => return Ok(page),
                Err(err) if attempt < MAX_RETRIES && is_retryable(&err) => {
                    attempt += 1;
                    tracing::warn!(error = %err, attempt = attempt, "retrying table data request");
                    tokio::time::sleep(retry_delay(attempt)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Updates a single cell.
    pub async fn update_cell(
        &self,
        db: &str,
        table: &str,
        req: &UpdateCellRequest,
    ) -> Result<u64, BridgeError> {
        self.patch(&format!("/api/databases/{db}/tables/{table}/rows"), req)
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    /// Inserts a row.
    pub async fn insert_row(
        &self,
        db: &str,
        table: &str,
        req: &InsertRowRequest,
    ) -> Result<u64, BridgeError> {
        self.post(&format!("/api/databases/{db}/tables/{table}/rows"), req)
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    /// Deletes rows matching a key.
    pub async fn delete_row(
        &self,
        db: &str,
        table: &str,
        req: &DeleteRowRequest,
    ) -> Result<u64, BridgeError> {
        self.delete_with_body(&format!("/api/databases/{db}/tables/{table}/rows"), req)
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    /// Deletes every row of a table.
    pub async fn delete_all_rows(&self, db: &str, table: &str) -> Result<u64, BridgeError> {
        self.delete(&format!("/api/databases/{db}/tables/{table}/data"))
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    // ============== Transfer ==============

    /// Exports a table and returns the rendered artifact.
    pub async fn export_table(
        &self,
        db: &str,
        table: &str,
        format: ExportFormat,
    ) -> Result<ExportArtifact, BridgeError> {
        self.post(
            &format!("/api/databases/{db}/tables/{table}/export"),
            &ExportRequest { format },
        )
        .await?
        .ok_or(BridgeError::MalformedResponse)
    }

    /// Imports rows from CSV or JSON text.
    pub async fn import_table(
        &self,
        db: &str,
        table: &str,
        req: &ImportRequest,
    ) -> Result<ImportResult, BridgeError> {
        self.post(&format!("/api/databases/{db}/tables/{table}/import"), req)
            .await?
            .ok_or(BridgeError::MalformedResponse)
    }

    /// Generates a dump script for a database.
    pub async fn create_dump(
        &self,
        db: &str,
        include_data: bool,
    ) -> Result<DumpResult, BridgeError> {
        self.post(
            &format!("/api/databases/{db}/dump"),
            &DumpRequest { include_data },
        )
        .await?
        .ok_or(BridgeError::MalformedResponse)
    }

    /// Executes a dump script statement by statement.
    pub async fn restore_dump(
        &self,
        db: &str,
        script: &str,
    ) -> Result<RestoreResult, BridgeError> {
        self.post(
            &format!("/api/databases/{db}/restore"),
            &RestoreRequest {
                script: script.to_string(),
            },
        )
        .await?
        .ok_or(BridgeError::MalformedResponse)
    }

    /// Writes a generated artifact (CSV/JSON export, dump script) to disk.
    pub fn save_artifact(&self, path: &Path, content: &str) -> Result<(), BridgeError> {
        std::fs::write(path, content)?;
        tracing::info!(path = %path.display(), bytes = content.len(), "artifact saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge_error(message: &str) -> BridgeError {
        BridgeError::Bridge {
            code: "QUERY_FAILED".into(),
            message: message.into(),
        }
    }

    #[test]
    fn retryable_messages_match_the_ui_patterns() {
        assert!(is_retryable(&bridge_error("connection was closed")));
        assert!(is_retryable(&bridge_error("Timeout expired")));
        assert!(is_retryable(&bridge_error("read ECONNRESET")));
        assert!(!is_retryable(&bridge_error("Invalid object name 'users'")));
        assert!(!is_retryable(&BridgeError::MalformedResponse));
    }

    #[test]
    fn backoff_grows_linearly() {
        assert_eq!(retry_delay(1), Duration::from_secs(1));
        assert_eq!(retry_delay(2), Duration::from_secs(2));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = BridgeClient::new("http://127.0.0.1:8089/");
        assert_eq!(client.url("/api/health"), "http://127.0.0.1:8089/api/health");
    }
}
