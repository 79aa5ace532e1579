//! SQL statement builders.
//!
//! Statements are assembled from validated, bracket-quoted identifiers and
//! positional `@Pn` placeholders; user-supplied values never end up inside
//! statement text except in generated dump scripts, which render SQL
//! literals on purpose.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use common::errors::{AppError, AppResult};
use common::models::{ColumnDescriptor, ColumnSpec, RowKey};
use common::utils::identifiers::{
    quote_ident, validate_column_type, validate_ident, QualifiedTable,
};

use crate::tds::{json_to_param, SqlParam};

/// A rendered WHERE fragment with its bound parameters.
#[derive(Debug, Default)]
pub struct FilterClause {
    /// `WHERE ...` or empty.
    pub clause: String,
    /// Parameters referenced by the clause, in placeholder order.
    pub params: Vec<SqlParam>,
}

/// Builds a filter conjunction from per-column values.
///
/// Booleans (including `"true"`/`"false"` strings) and numbers (including
/// numeric strings) compare with `=`; other strings match with
/// `LIKE '%value%'`. Null and empty-string values are skipped.
pub fn filter_clause(filters: &BTreeMap<String, JsonValue>) -> AppResult<FilterClause> {
    let mut conditions = Vec::new();
    let mut params = Vec::new();

    for (column, value) in filters {
        if matches!(value, JsonValue::Null) {
            continue;
        }
        if matches!(value, JsonValue::String(s) if s.is_empty()) {
            continue;
        }
        validate_ident(column)?;

        let placeholder = format!("@P{}", params.len() + 1);
        match filter_param(value) {
            FilterParam::Exact(param) => {
                conditions.push(format!("{} = {}", quote_ident(column), placeholder));
                params.push(param);
            }
            FilterParam::Like(needle) => {
                conditions.push(format!("{} LIKE {}", quote_ident(column), placeholder));
                params.push(SqlParam::String(format!("%{needle}%")));
            }
        }
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    Ok(FilterClause { clause, params })
}

enum FilterParam {
    Exact(SqlParam),
    Like(String),
}

fn filter_param(value: &JsonValue) -> FilterParam {
    match value {
        JsonValue::Bool(b) => FilterParam::Exact(SqlParam::Bool(*b)),
        JsonValue::Number(_) => FilterParam::Exact(json_to_param(value)),
        JsonValue::String(s) => {
            if s == "true" || s == "false" {
                FilterParam::Exact(SqlParam::Bool(s == "true"))
            } else if let Ok(i) = s.parse::<i64>() {
                FilterParam::Exact(SqlParam::I64(i))
            } else if let Ok(f) = s.parse::<f64>() {
                FilterParam::Exact(SqlParam::F64(f))
            } else {
                FilterParam::Like(s.clone())
            }
        }
        other => FilterParam::Like(other.to_string()),
    }
}

/// Total row count with the same filters as the page query.
pub fn count_statement(table: &QualifiedTable, filter: &FilterClause) -> String {
    format!(
        "SELECT COUNT_BIG(*) AS total_count FROM {} {}",
        table.qualified(),
        filter.clause
    )
    .trim_end()
    .to_string()
}

/// One page of rows via a derived row-numbering subquery.
///
/// `row_num` is synthetic and stripped from the decoded page.
pub fn page_statement(
    table: &QualifiedTable,
    filter: &FilterClause,
    offset: u64,
    page_size: u64,
) -> String {
    format!(
        "SELECT * FROM ( \
         SELECT *, ROW_NUMBER() OVER (ORDER BY (SELECT NULL)) AS row_num FROM {} {} \
         ) AS numbered WHERE row_num > {} AND row_num <= {}",
        table.qualified(),
        filter.clause,
        offset,
        offset + page_size
    )
}

fn row_key_clause(key: &RowKey, first_placeholder: usize) -> AppResult<(String, Vec<SqlParam>)> {
    if key.is_empty() {
        return Err(AppError::Validation(
            "Row key must contain at least one column".to_string(),
        ));
    }

    let mut conditions = Vec::new();
    let mut params = Vec::new();
    for (index, (column, value)) in key.iter().enumerate() {
        validate_ident(column)?;
        conditions.push(format!(
            "{} = @P{}",
            quote_ident(column),
            first_placeholder + index
        ));
        params.push(json_to_param(value));
    }
    Ok((conditions.join(" AND "), params))
}

/// UPDATE of a single cell, identified by a row key.
pub fn update_cell_statement(
    table: &QualifiedTable,
    column: &str,
    value: &JsonValue,
    key: &RowKey,
) -> AppResult<(String, Vec<SqlParam>)> {
    validate_ident(column)?;
    let (key_clause, key_params) = row_key_clause(key, 2)?;

    let sql = format!(
        "UPDATE {} SET {} = @P1 WHERE {}",
        table.qualified(),
        quote_ident(column),
        key_clause
    );

    let mut params = vec![json_to_param(value)];
    params.extend(key_params);
    Ok((sql, params))
}

/// DELETE of rows matching a row key.
pub fn delete_row_statement(
    table: &QualifiedTable,
    key: &RowKey,
) -> AppResult<(String, Vec<SqlParam>)> {
    let (key_clause, params) = row_key_clause(key, 1)?;
    let sql = format!("DELETE FROM {} WHERE {}", table.qualified(), key_clause);
    Ok((sql, params))
}

/// INSERT from a column → value map.
pub fn insert_statement(
    table: &QualifiedTable,
    values: &BTreeMap<String, JsonValue>,
) -> AppResult<(String, Vec<SqlParam>)> {
    if values.is_empty() {
        return Err(AppError::Validation(
            "At least one column value is required".to_string(),
        ));
    }

    let mut columns = Vec::new();
    let mut params = Vec::new();
    for (column, value) in values {
        validate_ident(column)?;
        columns.push(column.as_str());
        params.push(json_to_param(value));
    }

    Ok((insert_columns_statement(table, &columns), params))
}

/// INSERT statement text for a fixed column list (values bound separately).
pub fn insert_columns_statement(table: &QualifiedTable, columns: &[&str]) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("@P{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.qualified(),
        column_list,
        placeholders
    )
}

/// CREATE TABLE from validated column specs.
pub fn create_table_statement(
    table: &QualifiedTable,
    columns: &[ColumnSpec],
) -> AppResult<String> {
    let mut definitions = Vec::new();
    for spec in columns {
        validate_ident(&spec.name)?;
        validate_column_type(&spec.data_type)?;

        let mut definition = format!("{} {}", quote_ident(&spec.name), spec.data_type);
        if let Some(length) = spec.length {
            definition.push_str(&format!("({length})"));
        }
        definition.push_str(if spec.nullable { " NULL" } else { " NOT NULL" });
        if let Some(default) = &spec.default_value {
            if default.contains(';') {
                return Err(AppError::Validation(format!(
                    "Invalid default expression for column '{}'",
                    spec.name
                )));
            }
            if !default.is_empty() {
                definition.push_str(&format!(" DEFAULT {default}"));
            }
        }
        definitions.push(definition);
    }

    Ok(format!(
        "CREATE TABLE {} ({})",
        table.qualified(),
        definitions.join(", ")
    ))
}

/// Escapes a string for use inside a single-quoted SQL literal.
pub fn escape_str(value: &str) -> String {
    value.replace('\'', "''")
}

/// Renders a JSON value as a SQL literal for generated dump scripts.
pub fn sql_literal(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(true) => "1".to_string(),
        JsonValue::Bool(false) => "0".to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => format!("'{}'", escape_str(s)),
        other => format!("'{}'", escape_str(&other.to_string())),
    }
}

/// Renders the guarded CREATE TABLE section of a dump for one table.
pub fn dump_create_table(
    schema: &str,
    table: &str,
    columns: &[ColumnDescriptor],
) -> String {
    let qualified = format!("{}.{}", quote_ident(schema), quote_ident(table));
    let mut script = format!("-- Table structure for {qualified}\n");
    script.push_str(&format!(
        "IF NOT EXISTS (SELECT * FROM sysobjects WHERE name='{}' AND xtype='U')\n",
        escape_str(table)
    ));
    script.push_str(&format!("CREATE TABLE {qualified} (\n"));

    let definitions: Vec<String> = columns
        .iter()
        .map(|col| {
            let mut definition = format!("  {} {}", quote_ident(&col.column_name), col.data_type);

            if let Some(max_length) = col.character_maximum_length {
                if max_length < 0 {
                    definition.push_str("(MAX)");
                } else {
                    definition.push_str(&format!("({max_length})"));
                }
            } else if let Some(precision) = col.numeric_precision {
                definition.push_str(&format!("({precision}"));
                if let Some(scale) = col.numeric_scale {
                    definition.push_str(&format!(",{scale}"));
                }
                definition.push(')');
            }

            if !col.is_nullable {
                definition.push_str(" NOT NULL");
            }
            if let Some(default) = &col.column_default {
                definition.push_str(&format!(" DEFAULT {default}"));
            }
            definition
        })
        .collect();

    script.push_str(&definitions.join(",\n"));
    script.push_str("\n);\n\n");
    script
}

/// Renders one INSERT statement of a dump.
pub fn dump_insert_row(
    schema: &str,
    table: &str,
    columns: &[String],
    values: &[JsonValue],
) -> String {
    let qualified = format!("{}.{}", quote_ident(schema), quote_ident(table));
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let value_list = values
        .iter()
        .map(sql_literal)
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {qualified} ({column_list}) VALUES ({value_list});\n")
}

/// Splits a dump script into executable statements.
///
/// Statements are separated by `;`; comment lines are stripped from each
/// fragment and blank fragments are dropped.
pub fn split_script(script: &str) -> Vec<String> {
    script
        .split(';')
        .filter_map(|fragment| {
            let cleaned = fragment
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string();
            if cleaned.is_empty() {
                None
            } else {
                Some(cleaned)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(name: &str) -> QualifiedTable {
        QualifiedTable::parse(name).unwrap()
    }

    fn filters(pairs: &[(&str, JsonValue)]) -> BTreeMap<String, JsonValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn filters_choose_operator_by_type() {
        let clause = filter_clause(&filters(&[
            ("active", json!(true)),
            ("age", json!(30)),
            ("name", json!("smith")),
        ]))
        .unwrap();

        assert_eq!(
            clause.clause,
            "WHERE [active] = @P1 AND [age] = @P2 AND [name] LIKE @P3"
        );
        assert_eq!(
            clause.params,
            vec![
                SqlParam::Bool(true),
                SqlParam::I64(30),
                SqlParam::String("%smith%".into())
            ]
        );
    }

    #[test]
    fn string_filters_coerce_numbers_and_booleans() {
        let clause = filter_clause(&filters(&[
            ("enabled", json!("false")),
            ("quantity", json!("17")),
        ]))
        .unwrap();
        assert_eq!(clause.clause, "WHERE [enabled] = @P1 AND [quantity] = @P2");
        assert_eq!(clause.params, vec![SqlParam::Bool(false), SqlParam::I64(17)]);
    }

    #[test]
    fn empty_filter_values_are_skipped() {
        let clause =
            filter_clause(&filters(&[("a", json!(null)), ("b", json!(""))])).unwrap();
        assert_eq!(clause.clause, "");
        assert!(clause.params.is_empty());
    }

    #[test]
    fn page_statement_numbers_rows() {
        let filter = filter_clause(&filters(&[("name", json!("x"))])).unwrap();
        let sql = page_statement(&table("sales.orders"), &filter, 20, 10);
        assert!(sql.contains("ROW_NUMBER() OVER (ORDER BY (SELECT NULL)) AS row_num"));
        assert!(sql.contains("FROM [sales].[orders] WHERE [name] LIKE @P1"));
        assert!(sql.contains("row_num > 20 AND row_num <= 30"));
    }

    #[test]
    fn count_statement_reuses_filter() {
        let filter = FilterClause::default();
        assert_eq!(
            count_statement(&table("users"), &filter),
            "SELECT COUNT_BIG(*) AS total_count FROM [dbo].[users]"
        );
    }

    #[test]
    fn update_cell_binds_value_then_key() {
        let key: RowKey = filters(&[("id", json!(7))]);
        let (sql, params) =
            update_cell_statement(&table("users"), "email", &json!("a@b.c"), &key).unwrap();
        assert_eq!(
            sql,
            "UPDATE [dbo].[users] SET [email] = @P1 WHERE [id] = @P2"
        );
        assert_eq!(
            params,
            vec![SqlParam::String("a@b.c".into()), SqlParam::I64(7)]
        );
    }

    #[test]
    fn delete_row_requires_key() {
        let empty: RowKey = RowKey::new();
        assert!(delete_row_statement(&table("users"), &empty).is_err());

        let key: RowKey = filters(&[("id", json!("42"))]);
        let (sql, params) = delete_row_statement(&table("users"), &key).unwrap();
        assert_eq!(sql, "DELETE FROM [dbo].[users] WHERE [id] = @P1");
        assert_eq!(params, vec![SqlParam::String("42".into())]);
    }

    #[test]
    fn insert_statement_orders_placeholders() {
        let values = filters(&[("age", json!(3)), ("name", json!("Ada"))]);
        let (sql, params) = insert_statement(&table("people"), &values).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO [dbo].[people] ([age], [name]) VALUES (@P1, @P2)"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn create_table_renders_specs() {
        let columns = vec![
            ColumnSpec {
                name: "id".into(),
                data_type: "int".into(),
                length: None,
                nullable: false,
                default_value: None,
            },
            ColumnSpec {
                name: "name".into(),
                data_type: "varchar".into(),
                length: Some(255),
                nullable: true,
                default_value: Some("'unknown'".into()),
            },
        ];
        let sql = create_table_statement(&table("people"), &columns).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE [dbo].[people] ([id] int NOT NULL, [name] varchar(255) NULL DEFAULT 'unknown')"
        );
    }

    #[test]
    fn create_table_rejects_unknown_types() {
        let columns = vec![ColumnSpec {
            name: "loc".into(),
            data_type: "geography".into(),
            length: None,
            nullable: true,
            default_value: None,
        }];
        assert!(create_table_statement(&table("places"), &columns).is_err());
    }

    #[test]
    fn literals_escape_quotes() {
        assert_eq!(sql_literal(&json!(null)), "NULL");
        assert_eq!(sql_literal(&json!(true)), "1");
        assert_eq!(sql_literal(&json!(2.5)), "2.5");
        assert_eq!(sql_literal(&json!("O'Brien")), "'O''Brien'");
    }

    #[test]
    fn dump_create_table_handles_lengths() {
        let columns = vec![
            ColumnDescriptor {
                column_name: "id".into(),
                data_type: "int".into(),
                character_maximum_length: None,
                numeric_precision: Some(10),
                numeric_scale: Some(0),
                is_nullable: false,
                column_default: None,
                is_primary_key: false,
            },
            ColumnDescriptor {
                column_name: "notes".into(),
                data_type: "nvarchar".into(),
                character_maximum_length: Some(-1),
                numeric_precision: None,
                numeric_scale: None,
                is_nullable: true,
                column_default: None,
                is_primary_key: false,
            },
        ];
        let script = dump_create_table("dbo", "things", &columns);
        assert!(script.contains("IF NOT EXISTS (SELECT * FROM sysobjects WHERE name='things' AND xtype='U')"));
        assert!(script.contains("[id] int(10,0) NOT NULL"));
        assert!(script.contains("[notes] nvarchar(MAX)"));
    }

    #[test]
    fn split_script_drops_comments_and_blanks() {
        let script = "-- Database Dump for shop\n\n-- Table structure for [dbo].[a]\nIF NOT EXISTS (SELECT * FROM sysobjects WHERE name='a' AND xtype='U')\nCREATE TABLE [dbo].[a] (\n  [id] int NOT NULL\n);\n\n-- Data for [dbo].[a]\nINSERT INTO [dbo].[a] ([id]) VALUES (1);\n";
        let statements = split_script(script);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("IF NOT EXISTS"));
        assert!(statements[0].contains("CREATE TABLE [dbo].[a]"));
        assert!(statements[1].starts_with("INSERT INTO"));
    }
}
