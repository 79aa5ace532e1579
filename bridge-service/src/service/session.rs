//! Server connection, session resume and saved credentials.

use std::sync::Arc;

use validator::Validate;

use common::errors::AppResult;
use common::models::{ConnectRequest, ConnectionProfile, SaveCredentialRequest, SessionRecord};
use common::utils::IdGenerator;

use crate::registry::{PoolRegistry, ServerCredentials};
use crate::stores::{CredentialStore, SessionStore};

/// Connection/session/credential operations.
pub struct SessionService {
    registry: Arc<PoolRegistry>,
    sessions: SessionStore,
    credentials: CredentialStore,
}

impl SessionService {
    /// Creates a new session service instance.
    pub fn new(
        registry: Arc<PoolRegistry>,
        sessions: SessionStore,
        credentials: CredentialStore,
    ) -> Self {
        Self {
            registry,
            sessions,
            credentials,
        }
    }

    /// Connects to a server and records the active session.
    pub async fn connect(&self, req: ConnectRequest) -> AppResult<SessionRecord> {
        req.validate()?;

        self.registry
            .connect(ServerCredentials {
                server: req.server.clone(),
                username: req.username.clone(),
                password: req.password.clone(),
            })
            .await?;

        let record =
            SessionRecord::started_now(&req.server, &req.username, req.connection_name.clone());
        self.sessions.save(&record)?;

        if req.save_credentials {
            let profile = SaveCredentialRequest {
                name: req.connection_name,
                server: req.server,
                username: req.username,
                password: req.password,
            }
            .into_profile(IdGenerator::profile_id());
            self.credentials.append(profile)?;
        }

        Ok(record)
    }

    /// Tears down every pool and forgets the session.
    pub async fn disconnect(&self) -> AppResult<()> {
        self.registry.disconnect().await;
        self.sessions.clear()
    }

    /// Loads the persisted session record, if any.
    pub fn load_session(&self) -> AppResult<Option<SessionRecord>> {
        self.sessions.load()
    }

    /// Reconnects from a session record.
    ///
    /// The session never holds the password, so the connection is attempted
    /// with an empty one; a failure envelope tells the UI to prompt for it.
    pub async fn restore(&self, record: SessionRecord) -> AppResult<SessionRecord> {
        self.registry
            .connect(ServerCredentials {
                server: record.server.clone(),
                username: record.username.clone(),
                password: String::new(),
            })
            .await?;
        Ok(record)
    }

    /// Saves a credential profile.
    pub fn save_credential(&self, req: SaveCredentialRequest) -> AppResult<ConnectionProfile> {
        req.validate()?;
        let profile = req.into_profile(IdGenerator::profile_id());
        self.credentials.append(profile.clone())?;
        Ok(profile)
    }

    /// Loads all saved credential profiles.
    pub fn load_credentials(&self) -> AppResult<Vec<ConnectionProfile>> {
        self.credentials.load()
    }

    /// Deletes a credential profile by id.
    pub fn delete_credential(&self, id: &str) -> AppResult<bool> {
        self.credentials.delete(id)
    }
}
