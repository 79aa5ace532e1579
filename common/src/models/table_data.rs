//! Paged table data and row-editing models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::response::Pagination;

/// Identifies a row by column/value equality, typically the primary-key
/// column. Values are matched with bound parameters.
pub type RowKey = BTreeMap<String, serde_json::Value>;

/// Request body for a page of table data.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct TableDataRequest {
    /// Page number, 1-based.
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u32,

    /// Rows per page.
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 500))]
    pub page_size: u32,

    /// Per-column filters. Booleans and numbers match exactly; other strings
    /// match with `LIKE '%value%'`. Empty values are ignored.
    #[serde(default)]
    pub filters: BTreeMap<String, serde_json::Value>,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

impl Default for TableDataRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            filters: BTreeMap::new(),
        }
    }
}

/// A column in a returned page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TableColumn {
    /// Column name.
    pub name: String,
    /// Driver-reported column type.
    pub data_type: String,
}

/// One page of rows, recomputed per request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TablePage {
    /// Column metadata, in result order.
    pub columns: Vec<TableColumn>,
    /// Row data; each row is a vector of JSON values in column order.
    pub rows: Vec<Vec<serde_json::Value>>,
    /// Page/total bookkeeping.
    pub pagination: Pagination,
}

/// Request body for updating a single cell.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateCellRequest {
    /// Column to update.
    pub column: String,
    /// New value.
    pub value: serde_json::Value,
    /// Row identity (column → value equality conjunction).
    pub key: BTreeMap<String, serde_json::Value>,
}

/// Request body for deleting a single row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteRowRequest {
    /// Row identity (column → value equality conjunction).
    pub key: BTreeMap<String, serde_json::Value>,
}

/// Request body for inserting a row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InsertRowRequest {
    /// Column → value map for the new row.
    pub values: BTreeMap<String, serde_json::Value>,
}
