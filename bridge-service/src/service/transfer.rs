//! Data movement: export, import, dump and restore.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use common::errors::{AppError, AppResult};
use common::models::{
    DumpResult, ExportArtifact, ExportFormat, ImportFormat, ImportRequest, ImportResult,
    RestoreResult, StatementError,
};
use common::utils::identifiers::QualifiedTable;

use crate::csv;
use crate::registry::PoolRegistry;
use crate::service::tables::fetch_columns;
use crate::sql::{
    dump_create_table, dump_insert_row, insert_columns_statement, split_script,
};
use crate::tds::{execute, json_to_param, query_rows, rows_to_table, SqlParam};

const LIST_BASE_TABLES_SQL: &str = "SELECT TABLE_SCHEMA, TABLE_NAME \
     FROM INFORMATION_SCHEMA.TABLES \
     WHERE TABLE_TYPE = 'BASE TABLE' \
     ORDER BY TABLE_SCHEMA, TABLE_NAME";

/// Export/import/dump/restore operations.
pub struct TransferService {
    registry: Arc<PoolRegistry>,
}

impl TransferService {
    /// Creates a new transfer service instance.
    pub fn new(registry: Arc<PoolRegistry>) -> Self {
        Self { registry }
    }

    /// Exports a whole table as CSV or JSON text.
    pub async fn export(
        &self,
        database: &str,
        table_name: &str,
        format: ExportFormat,
    ) -> AppResult<ExportArtifact> {
        let table = QualifiedTable::parse(table_name)?;
        let pool = self.registry.pool_for(database).await?;

        let rows = query_rows(&pool, &format!("SELECT * FROM {}", table.qualified()), &[]).await?;
        let (columns, data) = rows_to_table(rows);
        let row_count = data.len();

        let content = match format {
            ExportFormat::Csv | ExportFormat::Excel => {
                let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
                csv::render(&names, &data)
            }
            ExportFormat::Json => {
                let objects: Vec<serde_json::Map<String, JsonValue>> = data
                    .into_iter()
                    .map(|row| {
                        columns
                            .iter()
                            .map(|c| c.name.clone())
                            .zip(row)
                            .collect()
                    })
                    .collect();
                serde_json::to_string_pretty(&objects)?
            }
        };

        tracing::info!(database = %database, table = %table, format = %format, rows = row_count, "table exported");
        Ok(ExportArtifact {
            format,
            content,
            row_count,
        })
    }

    /// Imports rows from CSV or JSON text.
    ///
    /// The payload's columns must exist on the table; rows are inserted in
    /// table-column order with NULL for missing values. The first failing
    /// insert aborts the import.
    pub async fn import(
        &self,
        database: &str,
        table_name: &str,
        req: ImportRequest,
    ) -> AppResult<ImportResult> {
        let table = QualifiedTable::parse(table_name)?;

        let parsed: Vec<BTreeMap<String, JsonValue>> = match req.format {
            ImportFormat::Csv => csv::parse(&req.payload)?,
            ImportFormat::Json => serde_json::from_str(&req.payload)
                .map_err(|e| AppError::Validation(format!("Invalid JSON payload: {e}")))?,
        };
        if parsed.is_empty() {
            return Err(AppError::Validation("No valid data to import".to_string()));
        }

        let pool = self.registry.pool_for(database).await?;
        let columns = fetch_columns(&pool, &table).await?;
        if columns.is_empty() {
            return Err(AppError::NotFound(format!("Table {table} not found")));
        }

        let column_names: Vec<String> =
            columns.iter().map(|c| c.column_name.clone()).collect();

        // Reject payload columns the table does not have.
        let invalid: Vec<String> = parsed[0]
            .keys()
            .filter(|k| !column_names.contains(k))
            .cloned()
            .collect();
        if !invalid.is_empty() {
            return Err(AppError::Validation(format!(
                "Invalid columns: {}",
                invalid.join(", ")
            )));
        }

        let column_refs: Vec<&str> = column_names.iter().map(String::as_str).collect();
        let sql = insert_columns_statement(&table, &column_refs);

        let mut inserted_count = 0u64;
        for row in &parsed {
            let params: Vec<SqlParam> = column_names
                .iter()
                .map(|col| json_to_param(row.get(col).unwrap_or(&JsonValue::Null)))
                .collect();
            execute(&pool, &sql, &params).await?;
            inserted_count += 1;
        }

        tracing::info!(database = %database, table = %table, inserted = inserted_count, "import finished");
        Ok(ImportResult { inserted_count })
    }

    /// Generates a SQL dump of every base table, optionally with data.
    pub async fn dump(&self, database: &str, include_data: bool) -> AppResult<DumpResult> {
        let pool = self.registry.pool_for(database).await?;

        let table_rows = query_rows(&pool, LIST_BASE_TABLES_SQL, &[]).await?;
        let tables: Vec<QualifiedTable> = table_rows
            .iter()
            .map(|row| {
                Ok(QualifiedTable {
                    schema: crate::tds::get_string(row, "TABLE_SCHEMA")?,
                    table: crate::tds::get_string(row, "TABLE_NAME")?,
                })
            })
            .collect::<AppResult<_>>()?;

        let mut script = format!(
            "-- Database Dump for {}\n-- Generated on {}\n\n",
            database,
            chrono::Utc::now().to_rfc3339()
        );

        for table in &tables {
            let columns = fetch_columns(&pool, table).await?;
            script.push_str(&dump_create_table(&table.schema, &table.table, &columns));

            if include_data {
                let rows =
                    query_rows(&pool, &format!("SELECT * FROM {}", table.qualified()), &[])
                        .await?;
                let (result_columns, data) = rows_to_table(rows);
                if !data.is_empty() {
                    let names: Vec<String> =
                        result_columns.iter().map(|c| c.name.clone()).collect();
                    script.push_str(&format!(
                        "-- Data for {}.{}\n",
                        common::utils::identifiers::quote_ident(&table.schema),
                        common::utils::identifiers::quote_ident(&table.table)
                    ));
                    for row in &data {
                        script.push_str(&dump_insert_row(
                            &table.schema,
                            &table.table,
                            &names,
                            row,
                        ));
                    }
                    script.push('\n');
                }
            }
        }

        tracing::info!(database = %database, tables = tables.len(), include_data = include_data, "dump generated");
        Ok(DumpResult {
            script,
            table_count: tables.len(),
        })
    }

    /// Executes a dump script statement by statement.
    ///
    /// Failing statements are collected instead of aborting the run; the
    /// result carries the success count and per-statement errors.
    pub async fn restore(&self, database: &str, script: &str) -> AppResult<RestoreResult> {
        if script.trim().is_empty() {
            return Err(AppError::Validation("Dump script is required".to_string()));
        }

        let pool = self.registry.pool_for(database).await?;
        let statements = split_script(script);

        let mut executed_count = 0usize;
        let mut errors = Vec::new();
        for statement in &statements {
            match execute(&pool, statement, &[]).await {
                Ok(_) => executed_count += 1,
                Err(err) => {
                    tracing::warn!(error = %err, "restore statement failed");
                    errors.push(StatementError {
                        statement: truncate_statement(statement),
                        error: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            database = %database,
            executed = executed_count,
            failed = errors.len(),
            "restore finished"
        );
        Ok(RestoreResult {
            executed_count,
            errors,
        })
    }
}

fn truncate_statement(statement: &str) -> String {
    if statement.chars().count() > 100 {
        let prefix: String = statement.chars().take(100).collect();
        format!("{prefix}...")
    } else {
        statement.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_statements_are_truncated_for_reporting() {
        let long = "X".repeat(150);
        let truncated = truncate_statement(&long);
        assert_eq!(truncated.len(), 103);
        assert!(truncated.ends_with("..."));

        assert_eq!(truncate_statement("SELECT 1"), "SELECT 1");
    }
}
