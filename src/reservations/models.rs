use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::offers::OfferDetails;
use crate::reservations::{PriceCalculator, StatusMachine};

/// Reservation status enum representing the lifecycle of a hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Active,
    Completed,
    Expired,
    Cancelled,
}

impl ReservationStatus {
    /// Convert status to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Active => "active",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Expired => "expired",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    /// Completed, Expired and Cancelled admit no further transition
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReservationStatus::Active)
    }
}

impl Default for ReservationStatus {
    fn default() -> Self {
        ReservationStatus::Active
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ReservationStatus::Active),
            "completed" => Ok(ReservationStatus::Completed),
            "expired" => Ok(ReservationStatus::Expired),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            _ => Err(format!("Invalid reservation status: {}", s)),
        }
    }
}

/// Temporary claim on offer inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub id: i32,
    pub user_id: i32,
    pub offer_id: i32,
    pub quantity: i32,
    pub status: ReservationStatus,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Reservation {
    /// Whether the hold deadline has passed; the deadline instant itself counts as passed
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Active → Completed
    pub fn complete(&mut self) -> Result<(), String> {
        self.move_to(ReservationStatus::Completed)
    }

    /// Active → Cancelled
    pub fn cancel(&mut self) -> Result<(), String> {
        self.move_to(ReservationStatus::Cancelled)
    }

    /// Active → Expired
    pub fn expire(&mut self) -> Result<(), String> {
        self.move_to(ReservationStatus::Expired)
    }

    fn move_to(&mut self, to: ReservationStatus) -> Result<(), String> {
        self.status = StatusMachine::transition(self.status, to)?;
        Ok(())
    }
}

/// Reservation about to be inserted by hold creation
#[derive(Debug, Clone, PartialEq)]
pub struct NewReservation {
    pub user_id: i32,
    pub offer_id: i32,
    pub quantity: i32,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Request DTO for creating a reservation
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateReservationRequest {
    #[validate(range(min = 1, message = "Offer id must be positive"))]
    #[schema(example = 42)]
    pub offer_id: i32,
    #[validate(range(min = 1, max = 1000, message = "Quantity must be between 1 and 1000"))]
    #[schema(example = 2)]
    pub quantity: i32,
}

/// Response DTO describing a reservation together with its offer
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationView {
    pub id: i32,
    pub offer_id: i32,
    pub offer_title: String,
    pub merchant_name: String,
    pub category_name: Option<String>,
    pub quantity: i32,
    #[schema(value_type = String, example = "40.00")]
    pub unit_price: Decimal,
    #[schema(value_type = String, example = "80.00")]
    pub total_price: Decimal,
    pub status: ReservationStatus,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Whole minutes left on an active hold, never negative
    pub minutes_remaining: i64,
    pub is_expired: bool,
}

impl ReservationView {
    /// Build the view as seen at `now`
    pub fn build(reservation: &Reservation, details: &OfferDetails, now: DateTime<Utc>) -> Self {
        let unit_price = details.offer.discounted_price;
        let active = reservation.status == ReservationStatus::Active;
        let minutes_remaining = if active {
            (reservation.expires_at - now).num_minutes().max(0)
        } else {
            0
        };
        let is_expired = reservation.status == ReservationStatus::Expired
            || (active && reservation.is_lapsed(now));

        Self {
            id: reservation.id,
            offer_id: reservation.offer_id,
            offer_title: details.offer.title.clone(),
            merchant_name: details.merchant_name.clone(),
            category_name: details.category_name.clone(),
            quantity: reservation.quantity,
            unit_price,
            total_price: PriceCalculator::total_price(unit_price, reservation.quantity),
            status: reservation.status,
            reserved_at: reservation.reserved_at,
            expires_at: reservation.expires_at,
            minutes_remaining,
            is_expired,
        }
    }
}

/// Response DTO for a completed purchase
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseResponse {
    pub reservation_id: i32,
    /// Codes in generation order
    pub coupon_codes: Vec<String>,
    #[schema(value_type = String, example = "200.00")]
    pub total_paid: Decimal,
    #[schema(value_type = String, example = "50.00")]
    pub remaining_balance: Decimal,
}
