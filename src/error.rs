// Shared error response body for the discount API
// Every module's error type renders through ErrorResponse so clients see one shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Consistent error response structure
///
/// Provides both a machine-readable `error_code` and a human-readable
/// `message`. Structured context such as the remaining coupon count goes
/// into `details`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "INSUFFICIENT_COUPONS", "NOT_FOUND")
    #[schema(example = "NOT_FOUND")]
    pub error_code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details, omitted from JSON when None
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,

    /// RFC 3339 timestamp of when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_code: &str, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.to_string(),
            message: message.into(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Generic body for 500-level errors; the cause is logged, never returned
    pub fn internal() -> Self {
        Self::new("INTERNAL_ERROR", "An internal server error occurred")
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}
