//! Saved credential models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// A saved connection profile.
///
/// Persisted as a JSON array in the user's home directory. The password is
/// stored and returned in plain text: the UI uses it to reconnect with one
/// click. This mirrors the store's on-disk format.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConnectionProfile {
    /// Generated unique identifier.
    pub id: String,

    /// Display name, defaults to `"{server} - {username}"`.
    pub name: String,

    /// Server address.
    pub server: String,

    /// Login username.
    pub username: String,

    /// Login password.
    pub password: String,

    /// When the profile was saved.
    pub saved_at: DateTime<Utc>,
}

/// Request body for saving a credential.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SaveCredentialRequest {
    /// Optional display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Server address.
    #[validate(length(min = 1, max = 255, message = "Server address is required"))]
    pub server: String,

    /// Login username.
    #[validate(length(min = 1, max = 128, message = "Username is required"))]
    pub username: String,

    /// Login password.
    #[serde(default)]
    pub password: String,
}

impl SaveCredentialRequest {
    /// Converts the request into a stored profile.
    pub fn into_profile(self, id: String) -> ConnectionProfile {
        let name = self
            .name
            .unwrap_or_else(|| format!("{} - {}", self.server, self.username));
        ConnectionProfile {
            id,
            name,
            server: self.server,
            username: self.username,
            password: self.password,
            saved_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_combines_server_and_user() {
        let profile = SaveCredentialRequest {
            name: None,
            server: "db.example.com".into(),
            username: "sa".into(),
            password: "secret".into(),
        }
        .into_profile("abc".into());

        assert_eq!(profile.name, "db.example.com - sa");
        assert_eq!(profile.id, "abc");
    }
}
