//! Table catalog operations: listing, structure, relations, DDL.

use std::sync::Arc;

use common::errors::{AppError, AppResult};
use common::models::{ColumnDescriptor, CreateTableRequest, RelationEntry, TableEntry};
use common::utils::identifiers::QualifiedTable;

use crate::registry::PoolRegistry;
use crate::sql::create_table_statement;
use crate::tds::{
    execute, get_datetime_text, get_i32, get_i64, get_opt_string, get_string, get_u8, query_rows,
    SqlParam, TdsPool,
};

const LIST_TABLES_SQL: &str = "SELECT \
       t.name AS table_name, \
       s.name AS schema_name, \
       t.create_date, \
       t.modify_date, \
       p.rows AS row_count \
     FROM sys.tables t \
     INNER JOIN sys.schemas s ON t.schema_id = s.schema_id \
     LEFT JOIN sys.partitions p ON t.object_id = p.object_id AND p.index_id IN (0,1) \
     ORDER BY s.name, t.name";

const STRUCTURE_SQL: &str = "SELECT \
       c.column_name, \
       c.data_type, \
       c.character_maximum_length, \
       c.numeric_precision, \
       c.numeric_scale, \
       c.is_nullable, \
       c.column_default, \
       CASE WHEN pk.column_name IS NOT NULL THEN 'YES' ELSE 'NO' END AS is_primary_key \
     FROM INFORMATION_SCHEMA.COLUMNS c \
     LEFT JOIN ( \
       SELECT ku.table_name, ku.column_name \
       FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
       INNER JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE ku \
         ON tc.constraint_name = ku.constraint_name \
       WHERE tc.constraint_type = 'PRIMARY KEY' \
     ) pk ON c.table_name = pk.table_name AND c.column_name = pk.column_name \
     WHERE c.table_schema = @P1 AND c.table_name = @P2 \
     ORDER BY c.ordinal_position";

const RELATIONS_SQL: &str = "SELECT \
       fk.name AS foreign_key_name, \
       tp.name AS parent_table, \
       cp.name AS parent_column, \
       tr.name AS referenced_table, \
       cr.name AS referenced_column \
     FROM sys.foreign_keys AS fk \
     INNER JOIN sys.tables AS tp ON fk.parent_object_id = tp.object_id \
     INNER JOIN sys.tables AS tr ON fk.referenced_object_id = tr.object_id \
     INNER JOIN sys.foreign_key_columns AS fkc ON fk.object_id = fkc.constraint_object_id \
     INNER JOIN sys.columns AS cp ON fkc.parent_column_id = cp.column_id AND fkc.parent_object_id = cp.object_id \
     INNER JOIN sys.columns AS cr ON fkc.referenced_column_id = cr.column_id AND fkc.referenced_object_id = cr.object_id \
     WHERE tp.name = @P1 AND SCHEMA_NAME(tp.schema_id) = @P2";

/// Fetches the column descriptors of a table.
///
/// Shared with the import and dump paths, which need the same structure.
pub(crate) async fn fetch_columns(
    pool: &TdsPool,
    table: &QualifiedTable,
) -> AppResult<Vec<ColumnDescriptor>> {
    let params = [
        SqlParam::String(table.schema.clone()),
        SqlParam::String(table.table.clone()),
    ];
    let rows = query_rows(pool, STRUCTURE_SQL, &params).await?;

    rows.iter()
        .map(|row| {
            Ok(ColumnDescriptor {
                column_name: get_string(row, "column_name")?,
                data_type: get_string(row, "data_type")?,
                character_maximum_length: get_i32(row, "character_maximum_length")?,
                numeric_precision: get_u8(row, "numeric_precision")?,
                numeric_scale: get_i32(row, "numeric_scale")?,
                is_nullable: get_string(row, "is_nullable")? == "YES",
                column_default: get_opt_string(row, "column_default")?,
                is_primary_key: get_string(row, "is_primary_key")? == "YES",
            })
        })
        .collect()
}

/// Table catalog and DDL operations.
pub struct TableService {
    registry: Arc<PoolRegistry>,
}

impl TableService {
    /// Creates a new table service instance.
    pub fn new(registry: Arc<PoolRegistry>) -> Self {
        Self { registry }
    }

    /// Lists tables of a database with schema and approximate row counts.
    pub async fn list(&self, database: &str) -> AppResult<Vec<TableEntry>> {
        let pool = self.registry.pool_for(database).await?;
        let rows = query_rows(&pool, LIST_TABLES_SQL, &[]).await?;

        rows.iter()
            .map(|row| {
                Ok(TableEntry {
                    table_name: get_string(row, "table_name")?,
                    schema_name: get_string(row, "schema_name")?,
                    create_date: get_datetime_text(row, "create_date")?,
                    modify_date: get_datetime_text(row, "modify_date")?,
                    row_count: get_i64(row, "row_count")?.unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Returns the column structure of a table.
    pub async fn structure(
        &self,
        database: &str,
        table_name: &str,
    ) -> AppResult<Vec<ColumnDescriptor>> {
        let table = QualifiedTable::parse(table_name)?;
        let pool = self.registry.pool_for(database).await?;
        fetch_columns(&pool, &table).await
    }

    /// Returns the foreign keys held by a table.
    pub async fn relations(
        &self,
        database: &str,
        table_name: &str,
    ) -> AppResult<Vec<RelationEntry>> {
        let table = QualifiedTable::parse(table_name)?;
        let pool = self.registry.pool_for(database).await?;

        let params = [
            SqlParam::String(table.table.clone()),
            SqlParam::String(table.schema.clone()),
        ];
        let rows = query_rows(&pool, RELATIONS_SQL, &params).await?;

        rows.iter()
            .map(|row| {
                Ok(RelationEntry {
                    foreign_key_name: get_string(row, "foreign_key_name")?,
                    parent_table: get_string(row, "parent_table")?,
                    parent_column: get_string(row, "parent_column")?,
                    referenced_table: get_string(row, "referenced_table")?,
                    referenced_column: get_string(row, "referenced_column")?,
                })
            })
            .collect()
    }

    /// Creates a table from column specs.
    pub async fn create(&self, database: &str, req: CreateTableRequest) -> AppResult<String> {
        if req.columns.is_empty() {
            return Err(AppError::Validation(
                "At least one column is required".to_string(),
            ));
        }

        let table = QualifiedTable::parse(&req.table_name)?;
        let sql = create_table_statement(&table, &req.columns)?;

        let pool = self.registry.pool_for(database).await?;
        execute(&pool, &sql, &[]).await?;

        tracing::info!(database = %database, table = %table, "table created");
        Ok("Table created successfully".to_string())
    }

    /// Drops a table.
    pub async fn drop(&self, database: &str, table_name: &str) -> AppResult<String> {
        let table = QualifiedTable::parse(table_name)?;
        let pool = self.registry.pool_for(database).await?;
        execute(&pool, &format!("DROP TABLE {}", table.qualified()), &[]).await?;

        tracing::info!(database = %database, table = %table, "table dropped");
        Ok("Table deleted successfully".to_string())
    }
}
