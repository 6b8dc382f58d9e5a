// HTTP handlers for reservation endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::error::ErrorResponse;
use crate::reservations::{
    CreateReservationRequest, PurchaseResponse, ReservationError, ReservationView,
};

/// Handler for POST /api/reservations
/// Places a hold on coupons of an offer for the authenticated user
#[utoipa::path(
    post,
    path = "/api/reservations",
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation created", body = ReservationView),
        (status = 400, description = "Invalid input or offer not available", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Account is inactive", body = ErrorResponse),
        (status = 404, description = "User or offer not found", body = ErrorResponse),
        (status = 409, description = "Not enough coupons left or duplicate reservation", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reservations"
)]
pub async fn create_reservation_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ReservationView>), ReservationError> {
    request.validate()?;

    let view = state
        .reservations
        .create_reservation(user.user_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// Handler for GET /api/reservations
/// Lists the authenticated user's reservations, newest first
#[utoipa::path(
    get,
    path = "/api/reservations",
    responses(
        (status = 200, description = "Reservations of the caller", body = Vec<ReservationView>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reservations"
)]
pub async fn list_reservations_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<ReservationView>>, ReservationError> {
    let views = state
        .reservations
        .get_user_reservations(user.user_id)
        .await?;

    Ok(Json(views))
}

/// Handler for GET /api/reservations/{id}
#[utoipa::path(
    get,
    path = "/api/reservations/{id}",
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation found", body = ReservationView),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Reservation not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reservations"
)]
pub async fn get_reservation_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> Result<Json<ReservationView>, ReservationError> {
    let view = state.reservations.get_reservation(user.user_id, id).await?;
    Ok(Json(view))
}

/// Handler for POST /api/reservations/{id}/purchase
/// Pays for an active reservation and returns the minted coupon codes
#[utoipa::path(
    post,
    path = "/api/reservations/{id}/purchase",
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation purchased", body = PurchaseResponse),
        (status = 400, description = "Reservation expired, not active, or balance too low", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Account is inactive", body = ErrorResponse),
        (status = 404, description = "Reservation not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reservations"
)]
pub async fn purchase_reservation_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> Result<Json<PurchaseResponse>, ReservationError> {
    let purchase = state
        .reservations
        .purchase_reservation(user.user_id, id)
        .await?;

    Ok(Json(purchase))
}

/// Handler for POST /api/reservations/{id}/cancel
/// Cancels an active reservation and returns its coupons to the offer
#[utoipa::path(
    post,
    path = "/api/reservations/{id}/cancel",
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 204, description = "Reservation cancelled"),
        (status = 400, description = "Reservation is not active", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Reservation not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reservations"
)]
pub async fn cancel_reservation_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ReservationError> {
    state
        .reservations
        .cancel_reservation(user.user_id, id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
