//! Pooled connection registry.
//!
//! Maintains one connection pool per logical key (`master` or a database
//! name), built lazily from the credentials of the active server connection
//! and torn down wholesale on disconnect.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;

use common::config::AppConfig;
use common::errors::{AppError, AppResult};

use crate::tds::{build_config, query_rows, TdsConnectionManager, TdsPool};

/// Registry key of the server-level connection.
pub const MASTER_KEY: &str = "master";

/// Credentials of the active server connection.
#[derive(Clone)]
pub struct ServerCredentials {
    pub server: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ServerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerCredentials")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Manages database connection pools.
///
/// Pool handles are cheap clones; the underlying connections are owned by
/// bb8. No eviction or scheduling happens here.
pub struct PoolRegistry {
    config: AppConfig,
    /// Runtime pools indexed by `master` or database name.
    pools: RwLock<HashMap<String, TdsPool>>,
    /// Credentials of the active connection, used to open per-database pools.
    credentials: RwLock<Option<ServerCredentials>>,
}

impl PoolRegistry {
    /// Creates an empty registry.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            pools: RwLock::new(HashMap::new()),
            credentials: RwLock::new(None),
        }
    }

    /// Connects to a server: tears down any previous pools, opens and
    /// verifies the `master` pool, and stores the credentials for lazy
    /// per-database pools.
    #[tracing::instrument(skip(self, credentials), fields(server = %credentials.server, username = %credentials.username))]
    pub async fn connect(&self, credentials: ServerCredentials) -> AppResult<()> {
        {
            let mut pools = self.pools.write().await;
            if !pools.is_empty() {
                tracing::info!(count = pools.len(), "closing existing pools");
            }
            pools.clear();
        }
        *self.credentials.write().await = None;

        let pool = self.open_pool(&credentials, MASTER_KEY).await?;
        query_rows(&pool, "SELECT 1", &[]).await?;

        self.pools.write().await.insert(MASTER_KEY.to_string(), pool);
        *self.credentials.write().await = Some(credentials);

        tracing::info!("connected to server");
        Ok(())
    }

    /// Returns the pool for a database, opening it from the stored
    /// credentials when it does not exist yet.
    pub async fn pool_for(&self, database: &str) -> AppResult<TdsPool> {
        if let Some(pool) = self.pools.read().await.get(database).cloned() {
            return Ok(pool);
        }

        let credentials = self
            .credentials
            .read()
            .await
            .clone()
            .ok_or(AppError::NoActiveConnection)?;

        let pool = self.open_pool(&credentials, database).await?;
        self.pools
            .write()
            .await
            .insert(database.to_string(), pool.clone());
        tracing::info!(database = %database, "opened database pool");
        Ok(pool)
    }

    /// Returns the `master` pool of the active connection.
    pub async fn master_pool(&self) -> AppResult<TdsPool> {
        self.pools
            .read()
            .await
            .get(MASTER_KEY)
            .cloned()
            .ok_or(AppError::NoActiveConnection)
    }

    /// Forgets the pool of a database (used before DROP DATABASE).
    pub async fn drop_database_pool(&self, database: &str) {
        if self.pools.write().await.remove(database).is_some() {
            tracing::info!(database = %database, "closed database pool");
        }
    }

    /// Tears down every pool and clears the stored credentials.
    pub async fn disconnect(&self) {
        let count = {
            let mut pools = self.pools.write().await;
            let count = pools.len();
            pools.clear();
            count
        };
        *self.credentials.write().await = None;
        tracing::info!(closed = count, "disconnected");
    }

    /// Whether a server connection is active.
    pub async fn is_connected(&self) -> bool {
        self.credentials.read().await.is_some()
    }

    /// Number of open pools, for health reporting.
    pub async fn pool_count(&self) -> usize {
        self.pools.read().await.len()
    }

    async fn open_pool(
        &self,
        credentials: &ServerCredentials,
        database: &str,
    ) -> AppResult<TdsPool> {
        let config = build_config(
            &credentials.server,
            &credentials.username,
            &credentials.password,
            database,
        );
        let manager = TdsConnectionManager::new(config);

        let pool = bb8::Pool::builder()
            .max_size(self.config.max_connections)
            .connection_timeout(Duration::from_secs(self.config.connect_timeout_secs))
            .build(manager)
            .await
            .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;

        // bb8 builds lazily; take one connection now so a bad address or
        // password fails the operation instead of the first query.
        pool.get()
            .await
            .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;

        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry() -> PoolRegistry {
        PoolRegistry::new(AppConfig::load_with_service("bridge-service-test"))
    }

    #[tokio::test]
    async fn operations_require_a_connection() {
        let registry = test_registry();
        assert!(!registry.is_connected().await);
        assert!(matches!(
            registry.master_pool().await,
            Err(AppError::NoActiveConnection)
        ));
        assert!(matches!(
            registry.pool_for("inventory").await,
            Err(AppError::NoActiveConnection)
        ));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let registry = test_registry();
        registry.disconnect().await;
        assert_eq!(registry.pool_count().await, 0);
        assert!(!registry.is_connected().await);
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let creds = ServerCredentials {
            server: "localhost".into(),
            username: "sa".into(),
            password: "secret".into(),
        };
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
