// HTTP handlers for coupon endpoints

use axum::{extract::State, Json};

use crate::auth::AuthenticatedUser;
use crate::coupons::{Coupon, CouponError};
use crate::error::ErrorResponse;

/// Handler for GET /api/coupons
/// Lists the coupons the authenticated user has purchased
#[utoipa::path(
    get,
    path = "/api/coupons",
    responses(
        (status = 200, description = "Coupons of the caller", body = Vec<Coupon>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "coupons"
)]
pub async fn list_coupons_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Coupon>>, CouponError> {
    let coupons = state.coupons.get_user_coupons(user.user_id).await?;
    Ok(Json(coupons))
}
