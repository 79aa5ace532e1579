//! Application state for the bridge service.

use std::sync::Arc;

use common::config::AppConfig;
use common::errors::AppResult;

use crate::registry::PoolRegistry;
use crate::stores::{CredentialStore, SessionStore};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub registry: Arc<PoolRegistry>,
    pub credentials: CredentialStore,
    pub sessions: SessionStore,
}

impl AppState {
    /// Creates application state with stores at their default home-directory
    /// locations.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        Ok(Self::with_stores(
            config,
            CredentialStore::default_location()?,
            SessionStore::default_location()?,
        ))
    }

    /// Creates application state with explicit store locations.
    pub fn with_stores(
        config: AppConfig,
        credentials: CredentialStore,
        sessions: SessionStore,
    ) -> Self {
        Self {
            registry: Arc::new(PoolRegistry::new(config.clone())),
            config,
            credentials,
            sessions,
        }
    }
}
