// Authentication error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::error::ErrorResponse;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Token generation error: {0}")]
    TokenGenerationError(String),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::ExpiredToken => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::TokenGenerationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AuthError::TokenGenerationError(msg) => {
                error!("Token generation error: {}", msg);
                ErrorResponse::internal()
            }
            other => {
                warn!("Rejected request: {}", other);
                ErrorResponse::new("UNAUTHORIZED", other.to_string())
            }
        };

        body.into_response_with(status)
    }
}
