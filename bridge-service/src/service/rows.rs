//! Row-level operations: paged reads with filters, cell updates, inserts,
//! deletes.

use std::sync::Arc;

use validator::Validate;

use common::errors::AppResult;
use common::models::{
    DeleteRowRequest, InsertRowRequest, TableDataRequest, TablePage, UpdateCellRequest,
};
use common::response::Pagination;
use common::utils::identifiers::QualifiedTable;

use crate::registry::PoolRegistry;
use crate::sql::{
    count_statement, delete_row_statement, filter_clause, insert_statement, page_statement,
    update_cell_statement,
};
use crate::tds::{execute, query_rows, rows_to_table};

/// Synthetic pagination column added by the row-numbering subquery.
const ROW_NUM: &str = "row_num";

/// Row CRUD and paging.
pub struct RowService {
    registry: Arc<PoolRegistry>,
}

impl RowService {
    /// Creates a new row service instance.
    pub fn new(registry: Arc<PoolRegistry>) -> Self {
        Self { registry }
    }

    /// Fetches one page of rows, with the total recomputed under the same
    /// filters.
    pub async fn page(
        &self,
        database: &str,
        table_name: &str,
        req: TableDataRequest,
    ) -> AppResult<TablePage> {
        req.validate()?;
        let table = QualifiedTable::parse(table_name)?;
        let filter = filter_clause(&req.filters)?;
        let pool = self.registry.pool_for(database).await?;

        let count_rows = query_rows(&pool, &count_statement(&table, &filter), &filter.params).await?;
        let total = count_rows
            .first()
            .and_then(|row| row.get::<i64, _>(0))
            .unwrap_or(0)
            .max(0) as u64;

        let offset = u64::from(req.page - 1) * u64::from(req.page_size);
        let sql = page_statement(&table, &filter, offset, u64::from(req.page_size));
        let rows = query_rows(&pool, &sql, &filter.params).await?;

        let (mut columns, mut data) = rows_to_table(rows);
        if columns.last().is_some_and(|c| c.name == ROW_NUM) {
            columns.pop();
            for row in &mut data {
                row.pop();
            }
        }

        tracing::debug!(
            database = %database,
            table = %table,
            page = req.page,
            rows = data.len(),
            total = total,
            "page fetched"
        );

        Ok(TablePage {
            columns,
            rows: data,
            pagination: Pagination::new(req.page, req.page_size, total),
        })
    }

    /// Updates one cell in rows matching the key.
    pub async fn update_cell(
        &self,
        database: &str,
        table_name: &str,
        req: UpdateCellRequest,
    ) -> AppResult<u64> {
        let table = QualifiedTable::parse(table_name)?;
        let (sql, params) = update_cell_statement(&table, &req.column, &req.value, &req.key)?;
        let pool = self.registry.pool_for(database).await?;
        execute(&pool, &sql, &params).await
    }

    /// Inserts a row from a column → value map.
    pub async fn insert(
        &self,
        database: &str,
        table_name: &str,
        req: InsertRowRequest,
    ) -> AppResult<u64> {
        let table = QualifiedTable::parse(table_name)?;
        let (sql, params) = insert_statement(&table, &req.values)?;
        let pool = self.registry.pool_for(database).await?;
        execute(&pool, &sql, &params).await
    }

    /// Deletes rows matching the key.
    pub async fn delete(
        &self,
        database: &str,
        table_name: &str,
        req: DeleteRowRequest,
    ) -> AppResult<u64> {
        let table = QualifiedTable::parse(table_name)?;
        let (sql, params) = delete_row_statement(&table, &req.key)?;
        let pool = self.registry.pool_for(database).await?;
        execute(&pool, &sql, &params).await
    }

    /// Deletes every row of a table.
    pub async fn delete_all(&self, database: &str, table_name: &str) -> AppResult<u64> {
        let table = QualifiedTable::parse(table_name)?;
        let pool = self.registry.pool_for(database).await?;
        let affected = execute(&pool, &format!("DELETE FROM {}", table.qualified()), &[]).await?;
        tracing::info!(database = %database, table = %table, affected = affected, "all rows deleted");
        Ok(affected)
    }
}
