// Error types for coupon lookups

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::error::ErrorResponse;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CouponError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for CouponError {
    fn into_response(self) -> Response {
        error!("Coupon lookup failed: {}", self);
        ErrorResponse::internal().into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
    }
}
