// HTTP handlers for policy endpoints

use axum::{extract::State, Json};

use crate::error::ErrorResponse;
use crate::settings::{Policy, SettingsError};

/// Handler for GET /api/settings/policy
/// Returns the policy currently applied to new reservations
#[utoipa::path(
    get,
    path = "/api/settings/policy",
    responses(
        (status = 200, description = "Current policy", body = Policy),
        (status = 500, description = "Policy could not be loaded", body = ErrorResponse)
    ),
    tag = "settings"
)]
pub async fn get_policy_handler(
    State(state): State<crate::AppState>,
) -> Result<Json<Policy>, SettingsError> {
    let policy = state.policy.policy().await?;
    Ok(Json(policy))
}
