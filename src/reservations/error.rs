use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, error};

use crate::coupons::CodeGenerationError;
use crate::error::ErrorResponse;
use crate::offers::{InventoryError, OfferUnavailable};
use crate::reservations::ReservationStatus;
use crate::settings::SettingsError;
use crate::store::{StoreError, ACTIVE_RESERVATION_INDEX};

/// Error types for reservation, settlement and cancellation
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("{resource} with id {id} not found")]
    NotFound { resource: &'static str, id: i32 },

    #[error("Account is inactive")]
    AccountInactive,

    #[error("{0}")]
    OfferNotAvailable(String),

    #[error("Insufficient coupons: requested {requested}, remaining {remaining}")]
    InsufficientCoupons { remaining: i32, requested: i32 },

    #[error("An active reservation for this offer already exists")]
    DuplicateReservation,

    #[error("Reservation has expired")]
    ReservationExpired,

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Decimal, available: Decimal },

    #[error("Business rule violation: {0}")]
    BusinessRuleViolation(String),

    #[error("Reservation is {actual}, expected {expected}")]
    InvalidStatus {
        actual: ReservationStatus,
        expected: ReservationStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Policy error: {0}")]
    Policy(#[from] SettingsError),

    /// Invariant broken by stored data, e.g. a release past total inventory
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReservationError {
    pub fn not_found(resource: &'static str, id: i32) -> Self {
        ReservationError::NotFound { resource, id }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReservationError::NotFound { .. } => StatusCode::NOT_FOUND,
            ReservationError::AccountInactive => StatusCode::FORBIDDEN,
            ReservationError::InsufficientCoupons { .. }
            | ReservationError::DuplicateReservation => StatusCode::CONFLICT,
            ReservationError::OfferNotAvailable(_)
            | ReservationError::ReservationExpired
            | ReservationError::InsufficientBalance { .. }
            | ReservationError::BusinessRuleViolation(_)
            | ReservationError::InvalidStatus { .. }
            | ReservationError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ReservationError::Store(_)
            | ReservationError::Policy(_)
            | ReservationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code used in the error body
    pub fn error_code(&self) -> &'static str {
        match self {
            ReservationError::NotFound { .. } => "NOT_FOUND",
            ReservationError::AccountInactive => "ACCOUNT_INACTIVE",
            ReservationError::OfferNotAvailable(_) => "OFFER_NOT_AVAILABLE",
            ReservationError::InsufficientCoupons { .. } => "INSUFFICIENT_COUPONS",
            ReservationError::DuplicateReservation => "DUPLICATE_RESERVATION",
            ReservationError::ReservationExpired => "RESERVATION_EXPIRED",
            ReservationError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            ReservationError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            ReservationError::InvalidStatus { .. } => "INVALID_STATUS",
            ReservationError::ValidationError(_) => "VALIDATION_ERROR",
            ReservationError::Store(_)
            | ReservationError::Policy(_)
            | ReservationError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        match self {
            ReservationError::Store(_)
            | ReservationError::Policy(_)
            | ReservationError::Internal(_) => {
                // Full cause stays in the log
                error!("Reservation operation failed: {}", self);
                ErrorResponse::internal()
            }
            ReservationError::InsufficientCoupons {
                remaining,
                requested,
            } => {
                debug!("{}", self);
                ErrorResponse::new(self.error_code(), self.to_string())
                    .with_details(json!({ "remaining": remaining, "requested": requested }))
            }
            ReservationError::InsufficientBalance {
                required,
                available,
            } => {
                debug!("{}", self);
                ErrorResponse::new(self.error_code(), self.to_string())
                    .with_details(json!({ "required": required, "available": available }))
            }
            ReservationError::InvalidStatus { actual, expected } => {
                debug!("{}", self);
                ErrorResponse::new(self.error_code(), self.to_string())
                    .with_details(json!({ "actual": actual, "expected": expected }))
            }
            _ => {
                debug!("{}", self);
                ErrorResponse::new(self.error_code(), self.to_string())
            }
        }
    }
}

impl IntoResponse for ReservationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        self.to_error_response().into_response_with(status)
    }
}

impl From<StoreError> for ReservationError {
    fn from(err: StoreError) -> Self {
        // The partial unique index is the last word on concurrent duplicate holds
        if err.violates(ACTIVE_RESERVATION_INDEX) {
            ReservationError::DuplicateReservation
        } else {
            ReservationError::Store(err)
        }
    }
}

impl From<CodeGenerationError> for ReservationError {
    fn from(err: CodeGenerationError) -> Self {
        match err {
            CodeGenerationError::Store(store) => store.into(),
            exhausted @ CodeGenerationError::Exhausted(_) => {
                ReservationError::Internal(exhausted.to_string())
            }
        }
    }
}

impl From<OfferUnavailable> for ReservationError {
    fn from(reason: OfferUnavailable) -> Self {
        ReservationError::OfferNotAvailable(reason.to_string())
    }
}

impl From<InventoryError> for ReservationError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Insufficient {
                remaining,
                requested,
            } => ReservationError::InsufficientCoupons {
                remaining,
                requested,
            },
            other => ReservationError::Internal(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ReservationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ReservationError::ValidationError(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ReservationError::not_found("Offer", 3).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ReservationError::AccountInactive.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ReservationError::DuplicateReservation.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ReservationError::InsufficientCoupons {
                remaining: 1,
                requested: 2
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ReservationError::ReservationExpired.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ReservationError::Internal("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_balance_details_carry_both_amounts() {
        let err = ReservationError::InsufficientBalance {
            required: dec!(100.00),
            available: dec!(50.00),
        };
        let body = serde_json::to_value(err.to_error_response()).unwrap();

        assert_eq!(body["error_code"], "INSUFFICIENT_BALANCE");
        assert_eq!(body["details"]["required"], "100.00");
        assert_eq!(body["details"]["available"], "50.00");
    }

    #[test]
    fn test_internal_errors_hide_cause() {
        let err = ReservationError::Internal("remaining 9 + 3 exceeds total 10".to_string());
        let body = err.to_error_response();
        assert_eq!(body.error_code, "INTERNAL_ERROR");
        assert!(!body.message.contains("exceeds"));
    }

    #[test]
    fn test_unique_index_conflict_becomes_duplicate() {
        let err: ReservationError = StoreError::Conflict(
            "duplicate key value (uq_reservations_active_user_offer)".to_string(),
        )
        .into();
        assert!(matches!(err, ReservationError::DuplicateReservation));

        let other: ReservationError = StoreError::Conflict("uq_coupons_code".to_string()).into();
        assert!(matches!(other, ReservationError::Store(_)));
    }

    #[test]
    fn test_inventory_shortfall_maps_to_insufficient_coupons() {
        let err: ReservationError = InventoryError::Insufficient {
            remaining: 40,
            requested: 50,
        }
        .into();
        assert!(matches!(
            err,
            ReservationError::InsufficientCoupons {
                remaining: 40,
                requested: 50
            }
        ));
    }
}
