//! Minimal CSV rendering and parsing for table export/import.
//!
//! Field values are JSON scalars; NULL renders as an empty field and an
//! empty field parses back to NULL.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use common::errors::{AppError, AppResult};

/// Renders rows as CSV with a header line.
pub fn render(columns: &[String], rows: &[Vec<JsonValue>]) -> String {
    if columns.is_empty() {
        return String::new();
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        columns
            .iter()
            .map(|c| escape_field(c))
            .collect::<Vec<_>>()
            .join(","),
    );

    for row in rows {
        let fields: Vec<String> = row.iter().map(|v| escape_field(&field_text(v))).collect();
        lines.push(fields.join(","));
    }

    lines.join("\n")
}

fn field_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Parses CSV text into row maps keyed by the header line.
///
/// Rows whose field count does not match the header are skipped with a
/// warning, matching the tolerant import behavior of the UI. Empty fields
/// parse as NULL.
pub fn parse(text: &str) -> AppResult<Vec<BTreeMap<String, JsonValue>>> {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    if lines.len() < 2 {
        return Err(AppError::Validation(
            "CSV must have at least a header row and one data row".to_string(),
        ));
    }

    let headers: Vec<String> = lines[0]
        .split(',')
        .map(|h| h.trim().trim_matches('"').to_string())
        .collect();

    let mut rows = Vec::new();
    for (number, line) in lines.iter().enumerate().skip(1) {
        let values: Vec<String> = line
            .split(',')
            .map(|v| v.trim().trim_matches('"').to_string())
            .collect();

        if values.len() != headers.len() {
            tracing::warn!(row = number + 1, "skipping row: column count mismatch");
            continue;
        }

        let row: BTreeMap<String, JsonValue> = headers
            .iter()
            .cloned()
            .zip(values.into_iter().map(|v| {
                if v.is_empty() {
                    JsonValue::Null
                } else {
                    JsonValue::String(v)
                }
            }))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_quotes_awkward_fields() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let rows = vec![
            vec![json!(1), json!("plain")],
            vec![json!(2), json!("has, comma")],
            vec![json!(null), json!("has \"quote\"")],
        ];
        let csv = render(&columns, &rows);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "id,name");
        assert_eq!(lines[1], "1,plain");
        assert_eq!(lines[2], "2,\"has, comma\"");
        assert_eq!(lines[3], ",\"has \"\"quote\"\"\"");
    }

    #[test]
    fn parse_builds_rows_from_header() {
        let rows = parse("id,name\n1,Ada\n2,Grace\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], json!("1"));
        assert_eq!(rows[1]["name"], json!("Grace"));
    }

    #[test]
    fn parse_skips_short_rows_and_nulls_empty_fields() {
        let rows = parse("id,name\n1\n2,\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!("2"));
        assert_eq!(rows[0]["name"], json!(null));
    }

    #[test]
    fn parse_requires_header_and_data() {
        assert!(parse("id,name\n").is_err());
        assert!(parse("").is_err());
    }
}
