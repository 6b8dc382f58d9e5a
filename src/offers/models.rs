use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Moderation / lifecycle status of an offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
    Cancelled,
}

impl OfferStatus {
    /// Convert status to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Approved => "approved",
            OfferStatus::Rejected => "rejected",
            OfferStatus::Expired => "expired",
            OfferStatus::Cancelled => "cancelled",
        }
    }

    /// Only approved offers lapse into `Expired`; every other status is left alone
    pub fn expire(self) -> Result<OfferStatus, String> {
        match self {
            OfferStatus::Approved => Ok(OfferStatus::Expired),
            other => Err(format!("Invalid offer status transition from {} to expired", other)),
        }
    }
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OfferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(OfferStatus::Pending),
            "approved" => Ok(OfferStatus::Approved),
            "rejected" => Ok(OfferStatus::Rejected),
            "expired" => Ok(OfferStatus::Expired),
            "cancelled" => Ok(OfferStatus::Cancelled),
            _ => Err(format!("Invalid offer status: {}", s)),
        }
    }
}

/// A merchant's discount listing with finite coupon inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Offer {
    pub id: i32,
    pub merchant_id: i32,
    pub category_id: Option<i32>,
    pub title: String,
    pub status: OfferStatus,
    pub original_price: Decimal,
    /// Per-unit settlement price
    pub discounted_price: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_coupons: i32,
    pub remaining_coupons: i32,
}

/// Offer plus the display fields joined from merchant and category
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct OfferDetails {
    #[sqlx(flatten)]
    pub offer: Offer,
    pub merchant_name: String,
    pub category_name: Option<String>,
}
