//! Database-level operations on the connected server.

use std::sync::Arc;

use common::errors::{AppError, AppResult};
use common::models::DatabaseEntry;
use common::utils::identifiers::{is_system_database, quote_ident, validate_database_name};

use crate::registry::PoolRegistry;
use crate::tds::{execute, get_datetime_text, get_i32, get_string, query_rows};

const LIST_DATABASES_SQL: &str = "SELECT name, database_id, create_date \
     FROM sys.databases \
     WHERE database_id > 4 \
     ORDER BY name";

/// Database listing and lifecycle.
pub struct DatabaseService {
    registry: Arc<PoolRegistry>,
}

impl DatabaseService {
    /// Creates a new database service instance.
    pub fn new(registry: Arc<PoolRegistry>) -> Self {
        Self { registry }
    }

    /// Lists user databases (system databases have ids 1 through 4).
    pub async fn list(&self) -> AppResult<Vec<DatabaseEntry>> {
        let pool = self.registry.master_pool().await?;
        let rows = query_rows(&pool, LIST_DATABASES_SQL, &[]).await?;

        rows.iter()
            .map(|row| {
                Ok(DatabaseEntry {
                    name: get_string(row, "name")?,
                    database_id: get_i32(row, "database_id")?.unwrap_or_default(),
                    create_date: get_datetime_text(row, "create_date")?,
                })
            })
            .collect()
    }

    /// Creates a database after validating its name.
    pub async fn create(&self, name: &str) -> AppResult<String> {
        validate_database_name(name)?;

        let pool = self.registry.master_pool().await?;
        execute(&pool, &format!("CREATE DATABASE {}", quote_ident(name)), &[]).await?;

        tracing::info!(database = %name, "database created");
        Ok(format!("Database '{name}' created successfully"))
    }

    /// Drops a database, refusing system databases and closing its pool first.
    pub async fn drop(&self, name: &str) -> AppResult<String> {
        if is_system_database(name) {
            return Err(AppError::Validation(
                "Cannot delete system databases".to_string(),
            ));
        }

        let pool = self.registry.master_pool().await?;
        self.registry.drop_database_pool(name).await;
        execute(&pool, &format!("DROP DATABASE {}", quote_ident(name)), &[]).await?;

        tracing::info!(database = %name, "database dropped");
        Ok(format!("Database '{name}' deleted successfully"))
    }

    /// Opens (or reuses) the pool for a database.
    pub async fn open(&self, name: &str) -> AppResult<String> {
        self.registry.pool_for(name).await?;
        Ok(format!("Connected to {name}"))
    }
}
