use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use crate::coupons::{Coupon, NewCoupon};
use crate::models::UserAccount;
use crate::offers::{Offer, OfferDetails, OfferStatus};
use crate::reservations::{NewReservation, Reservation, ReservationStatus};
use crate::store::{Store, StoreError, StoreResult, UnitOfWork};

const OFFER_COLUMNS: &str = "o.id, o.merchant_id, o.category_id, o.title, o.status, o.original_price, \
     o.discounted_price, o.start_date, o.end_date, o.total_coupons, o.remaining_coupons";

const RESERVATION_COLUMNS: &str = "id, user_id, offer_id, quantity, status, reserved_at, expires_at";

const COUPON_COLUMNS: &str = "id, code, user_id, offer_id, reservation_id, price_paid, status, \
     purchased_at, used_at, expires_at";

/// Map unique and check violations to `StoreError::Conflict`
fn map_constraint(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() || db_err.is_check_violation() {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            return StoreError::Conflict(format!("{} ({})", db_err.message(), constraint));
        }
    }
    StoreError::Database(err)
}

/// Fail with `Missing` when an UPDATE touched no row
fn expect_row(rows_affected: u64, what: String) -> StoreResult<()> {
    if rows_affected == 0 {
        return Err(StoreError::Missing(what));
    }
    Ok(())
}

/// PostgreSQL-backed store; every unit of work is one transaction
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new PgStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// Open transaction; rolled back if dropped without `commit`
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn user_for_update(&mut self, user_id: i32) -> StoreResult<Option<UserAccount>> {
        let user = sqlx::query_as::<_, UserAccount>(
            r#"
            SELECT id, email, display_name, balance, is_active
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn set_user_balance(&mut self, user_id: i32, balance: Decimal) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET balance = $1 WHERE id = $2")
            .bind(balance)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_constraint)?;

        expect_row(result.rows_affected(), format!("user {}", user_id))
    }

    async fn offer_for_update(&mut self, offer_id: i32) -> StoreResult<Option<Offer>> {
        let sql = format!("SELECT {} FROM offers o WHERE o.id = $1 FOR UPDATE", OFFER_COLUMNS);
        let offer = sqlx::query_as::<_, Offer>(&sql)
            .bind(offer_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(offer)
    }

    async fn offer_details(&mut self, offer_id: i32) -> StoreResult<Option<OfferDetails>> {
        let sql = format!(
            r#"
            SELECT {}, u.display_name AS merchant_name, c.name AS category_name
            FROM offers o
            JOIN users u ON u.id = o.merchant_id
            LEFT JOIN categories c ON c.id = o.category_id
            WHERE o.id = $1
            "#,
            OFFER_COLUMNS
        );
        let details = sqlx::query_as::<_, OfferDetails>(&sql)
            .bind(offer_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(details)
    }

    async fn set_offer_remaining(&mut self, offer_id: i32, remaining_coupons: i32) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE offers SET remaining_coupons = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(remaining_coupons)
        .bind(offer_id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_constraint)?;

        expect_row(result.rows_affected(), format!("offer {}", offer_id))
    }

    async fn set_offer_status(&mut self, offer_id: i32, status: OfferStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE offers SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status)
            .bind(offer_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_constraint)?;

        expect_row(result.rows_affected(), format!("offer {}", offer_id))
    }

    async fn lapsed_offers(&mut self, now: DateTime<Utc>) -> StoreResult<Vec<Offer>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM offers o
            WHERE o.status = $1 AND o.end_date <= $2
            ORDER BY o.end_date, o.id
            FOR UPDATE SKIP LOCKED
            "#,
            OFFER_COLUMNS
        );
        let offers = sqlx::query_as::<_, Offer>(&sql)
            .bind(OfferStatus::Approved)
            .bind(now)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(offers)
    }

    async fn active_reservation(
        &mut self,
        user_id: i32,
        offer_id: i32,
    ) -> StoreResult<Option<Reservation>> {
        let sql = format!(
            "SELECT {} FROM reservations WHERE user_id = $1 AND offer_id = $2 AND status = $3",
            RESERVATION_COLUMNS
        );
        let reservation = sqlx::query_as::<_, Reservation>(&sql)
            .bind(user_id)
            .bind(offer_id)
            .bind(ReservationStatus::Active)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(reservation)
    }

    async fn find_reservation(&mut self, reservation_id: i32) -> StoreResult<Option<Reservation>> {
        let sql = format!("SELECT {} FROM reservations WHERE id = $1", RESERVATION_COLUMNS);
        let reservation = sqlx::query_as::<_, Reservation>(&sql)
            .bind(reservation_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(reservation)
    }

    async fn reservation_for_update(&mut self, reservation_id: i32) -> StoreResult<Option<Reservation>> {
        let sql = format!(
            "SELECT {} FROM reservations WHERE id = $1 FOR UPDATE",
            RESERVATION_COLUMNS
        );
        let reservation = sqlx::query_as::<_, Reservation>(&sql)
            .bind(reservation_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(reservation)
    }

    async fn reservations_by_user(&mut self, user_id: i32) -> StoreResult<Vec<Reservation>> {
        let sql = format!(
            "SELECT {} FROM reservations WHERE user_id = $1 ORDER BY reserved_at DESC, id DESC",
            RESERVATION_COLUMNS
        );
        let reservations = sqlx::query_as::<_, Reservation>(&sql)
            .bind(user_id)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(reservations)
    }

    async fn lapsed_reservations(&mut self, now: DateTime<Utc>) -> StoreResult<Vec<Reservation>> {
        // Rows held by an in-flight purchase or cancel are picked up next tick.
        let sql = format!(
            r#"
            SELECT {}
            FROM reservations
            WHERE status = $1 AND expires_at <= $2
            ORDER BY expires_at, id
            FOR UPDATE SKIP LOCKED
            "#,
            RESERVATION_COLUMNS
        );
        let reservations = sqlx::query_as::<_, Reservation>(&sql)
            .bind(ReservationStatus::Active)
            .bind(now)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(reservations)
    }

    async fn insert_reservation(&mut self, reservation: &NewReservation) -> StoreResult<Reservation> {
        let sql = format!(
            r#"
            INSERT INTO reservations (user_id, offer_id, quantity, status, reserved_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        );
        let created = sqlx::query_as::<_, Reservation>(&sql)
            .bind(reservation.user_id)
            .bind(reservation.offer_id)
            .bind(reservation.quantity)
            .bind(ReservationStatus::Active)
            .bind(reservation.reserved_at)
            .bind(reservation.expires_at)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_constraint)?;

        Ok(created)
    }

    async fn set_reservation_status(
        &mut self,
        reservation_id: i32,
        status: ReservationStatus,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE reservations SET status = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(status)
        .bind(reservation_id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_constraint)?;

        expect_row(result.rows_affected(), format!("reservation {}", reservation_id))
    }

    async fn coupon_code_exists(&mut self, code: &str) -> StoreResult<bool> {
        // Soft-deleted rows count: the code stays taken.
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM coupons WHERE code = $1)")
            .bind(code)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(exists)
    }

    async fn insert_coupons(&mut self, coupons: &[NewCoupon]) -> StoreResult<Vec<Coupon>> {
        let sql = format!(
            r#"
            INSERT INTO coupons (code, user_id, offer_id, reservation_id, price_paid, status, purchased_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, 'active', $6, $7)
            RETURNING {}
            "#,
            COUPON_COLUMNS
        );

        let mut inserted = Vec::with_capacity(coupons.len());
        for coupon in coupons {
            let row = sqlx::query_as::<_, Coupon>(&sql)
                .bind(&coupon.code)
                .bind(coupon.user_id)
                .bind(coupon.offer_id)
                .bind(coupon.reservation_id)
                .bind(coupon.price_paid)
                .bind(coupon.purchased_at)
                .bind(coupon.expires_at)
                .fetch_one(&mut *self.tx)
                .await
                .map_err(map_constraint)?;
            inserted.push(row);
        }

        Ok(inserted)
    }

    async fn coupons_by_user(&mut self, user_id: i32) -> StoreResult<Vec<Coupon>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM coupons
            WHERE user_id = $1 AND is_deleted = FALSE
            ORDER BY purchased_at DESC, id DESC
            "#,
            COUPON_COLUMNS
        );
        let coupons = sqlx::query_as::<_, Coupon>(&sql)
            .bind(user_id)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(coupons)
    }

    async fn savepoint(&mut self) -> StoreResult<()> {
        sqlx::query("SAVEPOINT unit_item").execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self) -> StoreResult<()> {
        // Clears the aborted state a failed statement leaves on the transaction
        sqlx::query("ROLLBACK TO SAVEPOINT unit_item")
            .execute(&mut *self.tx)
            .await?;
        sqlx::query("RELEASE SAVEPOINT unit_item")
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn release_savepoint(&mut self) -> StoreResult<()> {
        sqlx::query("RELEASE SAVEPOINT unit_item")
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
