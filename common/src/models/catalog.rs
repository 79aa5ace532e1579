//! Catalog models: databases, tables, columns, relations.
//!
//! All descriptors are transient; they are re-fetched from the system catalog
//! views on each navigation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// A user database on the connected server.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DatabaseEntry {
    /// Database name.
    pub name: String,
    /// Server-assigned database id.
    pub database_id: i32,
    /// Creation timestamp as reported by `sys.databases`.
    pub create_date: String,
}

/// A table within a database.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TableEntry {
    /// Table name without schema.
    pub table_name: String,
    /// Schema the table belongs to.
    pub schema_name: String,
    /// Creation timestamp.
    pub create_date: String,
    /// Last structure modification timestamp.
    pub modify_date: String,
    /// Approximate row count from partition metadata.
    pub row_count: i64,
}

/// A column of a table, including primary-key membership.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ColumnDescriptor {
    /// Column name.
    pub column_name: String,
    /// Declared data type.
    pub data_type: String,
    /// Maximum length for character types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_maximum_length: Option<i32>,
    /// Precision for numeric types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_precision: Option<u8>,
    /// Scale for numeric types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_scale: Option<i32>,
    /// Whether the column accepts NULL.
    pub is_nullable: bool,
    /// Declared default expression, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_default: Option<String>,
    /// Whether the column is part of the primary key.
    pub is_primary_key: bool,
}

/// A foreign-key relationship touching a table.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RelationEntry {
    /// Constraint name.
    pub foreign_key_name: String,
    /// Table holding the foreign key.
    pub parent_table: String,
    /// Referencing column.
    pub parent_column: String,
    /// Table being referenced.
    pub referenced_table: String,
    /// Referenced column.
    pub referenced_column: String,
}

/// Request body for creating a database.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateDatabaseRequest {
    /// Database name; letters, digits and underscores only.
    #[validate(length(min = 1, max = 128, message = "Database name is required"))]
    pub name: String,
}

/// One column definition for table creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Data type; must be one of the supported SQL Server types.
    pub data_type: String,
    /// Length for character types (e.g. varchar).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Whether the column accepts NULL.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Default expression, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

fn default_nullable() -> bool {
    true
}

/// Request body for creating a table.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateTableRequest {
    /// Table name, `schema.table` or bare (defaults to `dbo`).
    #[validate(length(min = 1, max = 256, message = "Table name is required"))]
    pub table_name: String,

    /// Column definitions; at least one is required.
    #[validate(length(min = 1, message = "At least one column is required"))]
    pub columns: Vec<ColumnSpec>,
}
