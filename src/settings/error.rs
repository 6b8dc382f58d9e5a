// Error types for policy loading

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::error::ErrorResponse;

#[derive(Debug, Error)]
pub enum SettingsError {
    /// Stored policy values are out of range
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl IntoResponse for SettingsError {
    fn into_response(self) -> Response {
        // Both variants are server-side faults
        error!("Policy lookup failed: {}", self);
        ErrorResponse::internal().into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
    }
}
