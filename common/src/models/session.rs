//! Connection and session models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for connecting to a SQL Server instance.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ConnectRequest {
    /// Server address, `host` or `host:port` (default port 1433).
    #[validate(length(min = 1, max = 255, message = "Server address is required"))]
    pub server: String,

    /// Login username.
    #[validate(length(min = 1, max = 128, message = "Username is required"))]
    pub username: String,

    /// Login password. May be empty (e.g. when resuming a session the
    /// password has to be re-entered).
    #[serde(default)]
    pub password: String,

    /// Display name for this connection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_name: Option<String>,

    /// When set, the credentials are also appended to the credential store.
    #[serde(default)]
    pub save_credentials: bool,
}

/// The active-session record persisted to disk.
///
/// Exists only to offer a "resume" prompt on the next launch. The password is
/// never part of this record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionRecord {
    /// Server address of the active connection.
    pub server: String,

    /// Username of the active connection.
    pub username: String,

    /// Display name chosen by the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_name: Option<String>,

    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Builds the record for a connection established now.
    pub fn started_now(server: &str, username: &str, connection_name: Option<String>) -> Self {
        Self {
            server: server.to_string(),
            username: username.to_string(),
            connection_name,
            connected_at: Utc::now(),
        }
    }
}
