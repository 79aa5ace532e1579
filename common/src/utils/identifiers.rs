//! SQL Server identifier handling.
//!
//! Values travel as bound parameters; identifiers cannot, so they are
//! validated and bracket-quoted before being spliced into statement text.

use crate::errors::{AppError, AppResult};

/// System databases that must never be dropped.
const SYSTEM_DATABASES: [&str; 4] = ["master", "tempdb", "model", "msdb"];

/// Column types accepted for table creation.
pub const SUPPORTED_COLUMN_TYPES: [&str; 18] = [
    "int",
    "bigint",
    "smallint",
    "tinyint",
    "varchar",
    "nvarchar",
    "char",
    "nchar",
    "text",
    "ntext",
    "datetime",
    "date",
    "time",
    "decimal",
    "float",
    "real",
    "bit",
    "uniqueidentifier",
];

/// Quotes an identifier with brackets, escaping embedded `]`.
pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Checks that an identifier is usable inside bracket quoting.
pub fn validate_ident(name: &str) -> AppResult<()> {
    if name.is_empty() || name.len() > 128 || name.chars().any(|c| c.is_control()) {
        return Err(AppError::Validation(format!("Invalid identifier: '{name}'")));
    }
    Ok(())
}

/// Validates a database name for CREATE DATABASE.
///
/// Only letters, digits and underscores, not starting with a digit.
pub fn validate_database_name(name: &str) -> AppResult<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_start || !valid_rest {
        return Err(AppError::Validation(
            "Invalid database name. Use only letters, numbers, and underscores.".to_string(),
        ));
    }
    Ok(())
}

/// Whether the database is one of the protected system databases.
pub fn is_system_database(name: &str) -> bool {
    SYSTEM_DATABASES
        .iter()
        .any(|db| db.eq_ignore_ascii_case(name))
}

/// Validates a column type against the supported set.
pub fn validate_column_type(data_type: &str) -> AppResult<()> {
    if SUPPORTED_COLUMN_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(data_type))
    {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Unsupported column type: '{data_type}'"
        )))
    }
}

/// A table reference, `schema.table` or bare `table` (schema defaults to
/// `dbo`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedTable {
    /// Schema name.
    pub schema: String,
    /// Table name.
    pub table: String,
}

impl QualifiedTable {
    /// Parses a user-supplied table reference.
    pub fn parse(name: &str) -> AppResult<Self> {
        let (schema, table) = match name.split_once('.') {
            Some((schema, table)) => (schema, table),
            None => ("dbo", name),
        };
        validate_ident(schema)?;
        validate_ident(table)?;
        Ok(Self {
            schema: schema.to_string(),
            table: table.to_string(),
        })
    }

    /// The bracket-quoted `[schema].[table]` form.
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

impl std::fmt::Display for QualifiedTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_escapes_closing_bracket() {
        assert_eq!(quote_ident("plain"), "[plain]");
        assert_eq!(quote_ident("odd]name"), "[odd]]name]");
    }

    #[test]
    fn qualified_table_defaults_to_dbo() {
        let t = QualifiedTable::parse("users").unwrap();
        assert_eq!(t.schema, "dbo");
        assert_eq!(t.qualified(), "[dbo].[users]");

        let t = QualifiedTable::parse("sales.orders").unwrap();
        assert_eq!(t.qualified(), "[sales].[orders]");
    }

    #[test]
    fn database_name_rules() {
        assert!(validate_database_name("inventory_2024").is_ok());
        assert!(validate_database_name("_staging").is_ok());
        assert!(validate_database_name("1bad").is_err());
        assert!(validate_database_name("drop table").is_err());
        assert!(validate_database_name("").is_err());
    }

    #[test]
    fn system_databases_are_protected() {
        assert!(is_system_database("master"));
        assert!(is_system_database("TempDB"));
        assert!(!is_system_database("inventory"));
    }

    #[test]
    fn column_types_are_allowlisted() {
        assert!(validate_column_type("NVARCHAR").is_ok());
        assert!(validate_column_type("geography").is_err());
    }
}
