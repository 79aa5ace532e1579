//! API response wrapper types.
//!
//! Every bridge operation returns responses in this format so the UI can
//! handle success and failure uniformly.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard response envelope.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,

    /// Response data (present on success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Error details (present on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    /// Response metadata.
    pub meta: ResponseMeta,
}

/// Error details carried in the envelope.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Error code for client handling (e.g., "VALIDATION_ERROR", "NOT_FOUND").
    pub code: String,

    /// Human-readable error message (the driver message is preserved).
    pub message: String,

    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Response metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResponseMeta {
    /// Response timestamp.
    pub timestamp: DateTime<Utc>,

    /// Service name that handled the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            service: None,
        }
    }
}

impl ResponseMeta {
    /// Creates a new ResponseMeta with service name.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: Some(service.into()),
            ..Default::default()
        }
    }
}

/// Pagination information for paged results.
#[derive(Debug, Serialize, serde::Deserialize, ToSchema)]
pub struct Pagination {
    /// Current page number (1-based).
    pub page: u32,

    /// Number of items per page.
    pub page_size: u32,

    /// Total number of items.
    pub total: u64,

    /// Total number of pages.
    pub total_pages: u32,

    /// Whether there is a next page.
    pub has_next: bool,

    /// Whether there is a previous page.
    pub has_prev: bool,
}

impl Pagination {
    /// Creates pagination info from total count and page parameters.
    pub fn new(page: u32, page_size: u32, total: u64) -> Self {
        let total_pages = ((total as f64) / (page_size as f64)).ceil() as u32;
        Self {
            page,
            page_size,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response with data.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: ResponseMeta::default(),
        }
    }

    /// Creates a successful response with service name.
    pub fn ok_with_service(data: T, service: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: ResponseMeta::with_service(service),
        }
    }
}

impl ApiResponse<()> {
    /// Creates an error response.
    pub fn err(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
                details: None,
            }),
            meta: ResponseMeta::default(),
        }
    }

    /// Creates a success response without data.
    pub fn success() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            meta: ResponseMeta::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_omits_absent_fields() {
        let rendered =
            serde_json::to_value(ApiResponse::ok_with_service(vec![1, 2], "bridge-service"))
                .unwrap();
        assert_eq!(rendered["success"], true);
        assert_eq!(rendered["data"], serde_json::json!([1, 2]));
        assert!(rendered.get("error").is_none());
        assert_eq!(rendered["meta"]["service"], "bridge-service");
    }

    #[test]
    fn failure_envelope_carries_code_and_message() {
        let rendered =
            serde_json::to_value(ApiResponse::err("QUERY_FAILED", "Invalid object name 'x'"))
                .unwrap();
        assert_eq!(rendered["success"], false);
        assert_eq!(rendered["error"]["code"], "QUERY_FAILED");
        assert_eq!(rendered["error"]["message"], "Invalid object name 'x'");
    }

    #[test]
    fn pagination_math() {
        let p = Pagination::new(2, 10, 35);
        assert_eq!(p.total_pages, 4);
        assert!(p.has_next);
        assert!(p.has_prev);

        let last = Pagination::new(4, 10, 35);
        assert!(!last.has_next);
    }
}
