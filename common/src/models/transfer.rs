//! Import, export and dump/restore models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Supported export renderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma-separated values.
    Csv,
    /// Pretty-printed JSON array of objects.
    Json,
    /// Spreadsheet-compatible output; rendered as CSV.
    Excel,
}

impl ExportFormat {
    /// File extension for generated artifacts.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv | ExportFormat::Excel => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Excel => write!(f, "excel"),
        }
    }
}

/// Supported import payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    /// CSV with a header row.
    Csv,
    /// JSON array of objects.
    Json,
}

/// Request body for exporting a table.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExportRequest {
    /// Output rendering.
    pub format: ExportFormat,
}

/// A rendered export artifact. The client writes it to disk.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExportArtifact {
    /// Rendering that was applied.
    pub format: ExportFormat,
    /// Artifact text.
    pub content: String,
    /// Number of exported rows.
    pub row_count: usize,
}

/// Request body for importing rows into a table.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImportRequest {
    /// Payload encoding.
    pub format: ImportFormat,
    /// Raw CSV text or JSON array.
    pub payload: String,
}

/// Result of an import.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImportResult {
    /// Rows successfully inserted.
    pub inserted_count: u64,
}

/// Request body for creating a database dump.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DumpRequest {
    /// Include INSERT statements for table data.
    #[serde(default = "default_include_data")]
    pub include_data: bool,
}

fn default_include_data() -> bool {
    true
}

/// A generated dump script.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DumpResult {
    /// The SQL script.
    pub script: String,
    /// Number of tables covered.
    pub table_count: usize,
}

/// Request body for restoring a dump script.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RestoreRequest {
    /// The SQL script to execute.
    pub script: String,
}

/// A statement that failed during restore.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatementError {
    /// Leading fragment of the failed statement.
    pub statement: String,
    /// Driver error message.
    pub error: String,
}

/// Result of a restore run. Statements succeed or fail individually.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RestoreResult {
    /// Statements executed successfully.
    pub executed_count: usize,
    /// Failed statements with their errors.
    pub errors: Vec<StatementError>,
}
