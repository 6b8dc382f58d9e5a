use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Redemption status of a coupon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CouponStatus {
    Active,
    Used,
    Expired,
}

impl CouponStatus {
    /// Convert status to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponStatus::Active => "active",
            CouponStatus::Used => "used",
            CouponStatus::Expired => "expired",
        }
    }
}

impl Default for CouponStatus {
    fn default() -> Self {
        CouponStatus::Active
    }
}

impl std::fmt::Display for CouponStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A minted, uniquely-coded coupon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Coupon {
    pub id: i32,
    #[schema(example = "7QK2M9XZ4PLA")]
    pub code: String,
    pub user_id: i32,
    pub offer_id: i32,
    pub reservation_id: Option<i32>,
    /// Snapshot of the offer's discounted price at purchase time
    #[schema(value_type = String, example = "40.00")]
    pub price_paid: Decimal,
    pub status: CouponStatus,
    pub purchased_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

/// Coupon about to be inserted by the settlement process
#[derive(Debug, Clone, PartialEq)]
pub struct NewCoupon {
    pub code: String,
    pub user_id: i32,
    pub offer_id: i32,
    pub reservation_id: i32,
    pub price_paid: Decimal,
    pub purchased_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
