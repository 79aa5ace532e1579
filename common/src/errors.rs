//! Application error taxonomy.
//!
//! Every bridge operation returns the unified envelope; failures are
//! represented as [`AppError`] values that serialize into it. The underlying
//! driver message is always preserved so the UI can display it verbatim.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::response::ApiResponse;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Application errors with stable codes for client handling.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request failed validation (bad identifier, missing field, ...).
    #[error("{0}")]
    Validation(String),

    /// The referenced entity (credential, database, table) does not exist.
    #[error("{0}")]
    NotFound(String),

    /// An operation requires an active server connection but none exists.
    #[error("No active connection")]
    NoActiveConnection,

    /// Establishing a connection to SQL Server failed.
    #[error("{0}")]
    DatabaseConnection(String),

    /// A statement failed while executing.
    #[error("{0}")]
    DatabaseQuery(String),

    /// The pool could not hand out a connection in time.
    #[error("timed out waiting for a pooled connection: {0}")]
    PoolTimeout(String),

    /// Reading or writing a persisted file failed.
    #[error("{0}")]
    Storage(String),
}

impl AppError {
    /// Stable machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::NoActiveConnection => "NO_ACTIVE_CONNECTION",
            AppError::DatabaseConnection(_) => "CONNECTION_FAILED",
            AppError::DatabaseQuery(_) => "QUERY_FAILED",
            AppError::PoolTimeout(_) => "POOL_TIMEOUT",
            AppError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// HTTP status carried alongside the envelope.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NoActiveConnection => StatusCode::CONFLICT,
            AppError::DatabaseConnection(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseQuery(_) | AppError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::PoolTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiResponse::err(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(AppError::NoActiveConnection.code(), "NO_ACTIVE_CONNECTION");
        assert_eq!(
            AppError::Validation("bad name".into()).code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn statuses_map_by_class() {
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::DatabaseConnection("refused".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
