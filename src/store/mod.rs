// Persistence boundary for the reservation core
//
// Every logical operation (create, purchase, cancel, one sweeper tick) runs in
// a single UnitOfWork. Writes become visible only on `commit`; dropping the
// unit of work discards them. Reads that precede a write lock the rows they
// return until the unit of work ends.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::coupons::{Coupon, NewCoupon};
use crate::models::UserAccount;
use crate::offers::{Offer, OfferDetails, OfferStatus};
use crate::reservations::{NewReservation, Reservation, ReservationStatus};

/// Errors raised by a store implementation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness or check constraint rejected the write
    #[error("Constraint violated: {0}")]
    Conflict(String),

    /// An update targeted a row that does not exist
    #[error("Record not found: {0}")]
    Missing(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Partial unique index allowing one active reservation per (user, offer)
pub const ACTIVE_RESERVATION_INDEX: &str = "uq_reservations_active_user_offer";

impl StoreError {
    /// Whether the write was rejected by the named constraint
    pub fn violates(&self, constraint: &str) -> bool {
        matches!(self, StoreError::Conflict(msg) if msg.contains(constraint))
    }
}

/// Factory for units of work
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;
}

/// One atomic set of reads and writes against users, offers, reservations and coupons
#[async_trait]
pub trait UnitOfWork: Send {
    // Accounts
    async fn user_for_update(&mut self, user_id: i32) -> StoreResult<Option<UserAccount>>;
    async fn set_user_balance(&mut self, user_id: i32, balance: Decimal) -> StoreResult<()>;

    // Offers
    async fn offer_for_update(&mut self, offer_id: i32) -> StoreResult<Option<Offer>>;
    async fn offer_details(&mut self, offer_id: i32) -> StoreResult<Option<OfferDetails>>;
    async fn set_offer_remaining(&mut self, offer_id: i32, remaining_coupons: i32) -> StoreResult<()>;
    async fn set_offer_status(&mut self, offer_id: i32, status: OfferStatus) -> StoreResult<()>;
    /// Approved offers whose end date is at or before `now`
    async fn lapsed_offers(&mut self, now: DateTime<Utc>) -> StoreResult<Vec<Offer>>;

    // Reservations
    async fn active_reservation(
        &mut self,
        user_id: i32,
        offer_id: i32,
    ) -> StoreResult<Option<Reservation>>;
    async fn find_reservation(&mut self, reservation_id: i32) -> StoreResult<Option<Reservation>>;
    async fn reservation_for_update(&mut self, reservation_id: i32) -> StoreResult<Option<Reservation>>;
    /// All reservations of a user, newest first
    async fn reservations_by_user(&mut self, user_id: i32) -> StoreResult<Vec<Reservation>>;
    /// Active reservations whose hold has lapsed (`expires_at <= now`)
    async fn lapsed_reservations(&mut self, now: DateTime<Utc>) -> StoreResult<Vec<Reservation>>;
    async fn insert_reservation(&mut self, reservation: &NewReservation) -> StoreResult<Reservation>;
    async fn set_reservation_status(
        &mut self,
        reservation_id: i32,
        status: ReservationStatus,
    ) -> StoreResult<()>;

    // Coupons
    /// Whether any coupon (soft-deleted ones included) already carries `code`
    async fn coupon_code_exists(&mut self, code: &str) -> StoreResult<bool>;
    async fn insert_coupons(&mut self, coupons: &[NewCoupon]) -> StoreResult<Vec<Coupon>>;
    /// All live coupons of a user, newest first
    async fn coupons_by_user(&mut self, user_id: i32) -> StoreResult<Vec<Coupon>>;

    // Savepoints, one level deep
    /// Mark the current state so later writes can be undone on their own
    async fn savepoint(&mut self) -> StoreResult<()>;
    /// Undo every write since `savepoint` and drop the mark
    async fn rollback_to_savepoint(&mut self) -> StoreResult<()>;
    /// Keep the writes since `savepoint` and drop the mark
    async fn release_savepoint(&mut self) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
