// In-process store
//
// A unit of work holds the store's single async lock for its whole lifetime and
// edits a private copy of the state; `commit` swaps the copy in. Units of work
// are therefore fully serialized, and an uncommitted one leaves no trace.
// The database constraints of the PostgreSQL schema are checked on write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::coupons::{Coupon, CouponStatus, NewCoupon};
use crate::models::UserAccount;
use crate::offers::{Offer, OfferDetails, OfferStatus};
use crate::reservations::{NewReservation, Reservation, ReservationStatus};
use crate::store::{Store, StoreError, StoreResult, UnitOfWork, ACTIVE_RESERVATION_INDEX};

#[derive(Debug, Clone)]
struct StoredCoupon {
    coupon: Coupon,
    is_deleted: bool,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: BTreeMap<i32, UserAccount>,
    categories: BTreeMap<i32, String>,
    offers: BTreeMap<i32, Offer>,
    reservations: BTreeMap<i32, Reservation>,
    coupons: BTreeMap<i32, StoredCoupon>,
}

impl MemoryState {
    fn has_other_active(&self, user_id: i32, offer_id: i32, except: Option<i32>) -> bool {
        self.reservations.values().any(|r| {
            r.user_id == user_id
                && r.offer_id == offer_id
                && r.status == ReservationStatus::Active
                && Some(r.id) != except
        })
    }

    fn next_id<V>(map: &BTreeMap<i32, V>) -> i32 {
        map.keys().next_back().map_or(1, |last| last + 1)
    }
}

/// Store that keeps everything in memory behind one async mutex
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account
    pub async fn put_user(&self, user: UserAccount) {
        self.state.lock().await.users.insert(user.id, user);
    }

    /// Insert or replace a category name
    pub async fn put_category(&self, id: i32, name: &str) {
        self.state.lock().await.categories.insert(id, name.to_string());
    }

    /// Insert or replace an offer
    pub async fn put_offer(&self, offer: Offer) {
        self.state.lock().await.offers.insert(offer.id, offer);
    }

    /// Insert or replace a reservation as-is, bypassing the hold logic
    pub async fn put_reservation(&self, reservation: Reservation) {
        self.state
            .lock()
            .await
            .reservations
            .insert(reservation.id, reservation);
    }

    /// Hard-delete an offer record
    pub async fn remove_offer(&self, offer_id: i32) -> Option<Offer> {
        self.state.lock().await.offers.remove(&offer_id)
    }

    /// Flag a coupon as deleted; its code stays taken
    pub async fn soft_delete_coupon(&self, coupon_id: i32) -> bool {
        match self.state.lock().await.coupons.get_mut(&coupon_id) {
            Some(stored) => {
                stored.is_deleted = true;
                true
            }
            None => false,
        }
    }

    pub async fn user(&self, user_id: i32) -> Option<UserAccount> {
        self.state.lock().await.users.get(&user_id).cloned()
    }

    pub async fn offer(&self, offer_id: i32) -> Option<Offer> {
        self.state.lock().await.offers.get(&offer_id).cloned()
    }

    pub async fn reservation(&self, reservation_id: i32) -> Option<Reservation> {
        self.state
            .lock()
            .await
            .reservations
            .get(&reservation_id)
            .cloned()
    }

    /// Every reservation, ordered by id
    pub async fn reservations(&self) -> Vec<Reservation> {
        self.state.lock().await.reservations.values().cloned().collect()
    }

    /// Every coupon including soft-deleted ones, ordered by id
    pub async fn coupons(&self) -> Vec<Coupon> {
        self.state
            .lock()
            .await
            .coupons
            .values()
            .map(|stored| stored.coupon.clone())
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            savepoint: None,
        }))
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    savepoint: Option<MemoryState>,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn user_for_update(&mut self, user_id: i32) -> StoreResult<Option<UserAccount>> {
        Ok(self.working.users.get(&user_id).cloned())
    }

    async fn set_user_balance(&mut self, user_id: i32, balance: Decimal) -> StoreResult<()> {
        if balance < Decimal::ZERO {
            return Err(StoreError::Conflict(format!(
                "balance of user {} cannot be negative",
                user_id
            )));
        }
        let user = self
            .working
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::Missing(format!("user {}", user_id)))?;
        user.balance = balance;
        Ok(())
    }

    async fn offer_for_update(&mut self, offer_id: i32) -> StoreResult<Option<Offer>> {
        Ok(self.working.offers.get(&offer_id).cloned())
    }

    async fn offer_details(&mut self, offer_id: i32) -> StoreResult<Option<OfferDetails>> {
        let Some(offer) = self.working.offers.get(&offer_id) else {
            return Ok(None);
        };
        let Some(merchant) = self.working.users.get(&offer.merchant_id) else {
            return Ok(None);
        };
        let category_name = offer
            .category_id
            .and_then(|id| self.working.categories.get(&id).cloned());

        Ok(Some(OfferDetails {
            offer: offer.clone(),
            merchant_name: merchant.display_name.clone(),
            category_name,
        }))
    }

    async fn set_offer_remaining(&mut self, offer_id: i32, remaining_coupons: i32) -> StoreResult<()> {
        let offer = self
            .working
            .offers
            .get_mut(&offer_id)
            .ok_or_else(|| StoreError::Missing(format!("offer {}", offer_id)))?;
        if remaining_coupons < 0 || remaining_coupons > offer.total_coupons {
            return Err(StoreError::Conflict(format!(
                "remaining coupons {} outside 0..={} for offer {}",
                remaining_coupons, offer.total_coupons, offer_id
            )));
        }
        offer.remaining_coupons = remaining_coupons;
        Ok(())
    }

    async fn set_offer_status(&mut self, offer_id: i32, status: OfferStatus) -> StoreResult<()> {
        let offer = self
            .working
            .offers
            .get_mut(&offer_id)
            .ok_or_else(|| StoreError::Missing(format!("offer {}", offer_id)))?;
        offer.status = status;
        Ok(())
    }

    async fn lapsed_offers(&mut self, now: DateTime<Utc>) -> StoreResult<Vec<Offer>> {
        let mut offers: Vec<Offer> = self
            .working
            .offers
            .values()
            .filter(|o| o.status == OfferStatus::Approved && o.end_date <= now)
            .cloned()
            .collect();
        offers.sort_by_key(|o| (o.end_date, o.id));
        Ok(offers)
    }

    async fn active_reservation(
        &mut self,
        user_id: i32,
        offer_id: i32,
    ) -> StoreResult<Option<Reservation>> {
        Ok(self
            .working
            .reservations
            .values()
            .find(|r| {
                r.user_id == user_id
                    && r.offer_id == offer_id
                    && r.status == ReservationStatus::Active
            })
            .cloned())
    }

    async fn find_reservation(&mut self, reservation_id: i32) -> StoreResult<Option<Reservation>> {
        Ok(self.working.reservations.get(&reservation_id).cloned())
    }

    async fn reservation_for_update(&mut self, reservation_id: i32) -> StoreResult<Option<Reservation>> {
        self.find_reservation(reservation_id).await
    }

    async fn reservations_by_user(&mut self, user_id: i32) -> StoreResult<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = self
            .working
            .reservations
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        reservations.sort_by(|a, b| b.reserved_at.cmp(&a.reserved_at).then(b.id.cmp(&a.id)));
        Ok(reservations)
    }

    async fn lapsed_reservations(&mut self, now: DateTime<Utc>) -> StoreResult<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = self
            .working
            .reservations
            .values()
            .filter(|r| r.status == ReservationStatus::Active && r.expires_at <= now)
            .cloned()
            .collect();
        reservations.sort_by_key(|r| (r.expires_at, r.id));
        Ok(reservations)
    }

    async fn insert_reservation(&mut self, reservation: &NewReservation) -> StoreResult<Reservation> {
        if reservation.quantity < 1 {
            return Err(StoreError::Conflict("reservation quantity must be at least 1".to_string()));
        }
        if self
            .working
            .has_other_active(reservation.user_id, reservation.offer_id, None)
        {
            return Err(StoreError::Conflict(format!(
                "active reservation already exists for user {} and offer {} ({})",
                reservation.user_id, reservation.offer_id, ACTIVE_RESERVATION_INDEX
            )));
        }

        let id = MemoryState::next_id(&self.working.reservations);
        let stored = Reservation {
            id,
            user_id: reservation.user_id,
            offer_id: reservation.offer_id,
            quantity: reservation.quantity,
            status: ReservationStatus::Active,
            reserved_at: reservation.reserved_at,
            expires_at: reservation.expires_at,
        };
        self.working.reservations.insert(id, stored.clone());
        Ok(stored)
    }

    async fn set_reservation_status(
        &mut self,
        reservation_id: i32,
        status: ReservationStatus,
    ) -> StoreResult<()> {
        let (user_id, offer_id) = self
            .working
            .reservations
            .get(&reservation_id)
            .map(|r| (r.user_id, r.offer_id))
            .ok_or_else(|| StoreError::Missing(format!("reservation {}", reservation_id)))?;

        if status == ReservationStatus::Active
            && self
                .working
                .has_other_active(user_id, offer_id, Some(reservation_id))
        {
            return Err(StoreError::Conflict(format!(
                "active reservation already exists for user {} and offer {} ({})",
                user_id, offer_id, ACTIVE_RESERVATION_INDEX
            )));
        }

        if let Some(reservation) = self.working.reservations.get_mut(&reservation_id) {
            reservation.status = status;
        }
        Ok(())
    }

    async fn coupon_code_exists(&mut self, code: &str) -> StoreResult<bool> {
        Ok(self
            .working
            .coupons
            .values()
            .any(|stored| stored.coupon.code == code))
    }

    async fn insert_coupons(&mut self, coupons: &[NewCoupon]) -> StoreResult<Vec<Coupon>> {
        let mut taken: HashSet<String> = self
            .working
            .coupons
            .values()
            .map(|stored| stored.coupon.code.clone())
            .collect();

        let mut inserted = Vec::with_capacity(coupons.len());
        for new in coupons {
            if !taken.insert(new.code.clone()) {
                return Err(StoreError::Conflict(format!("coupon code {} already exists", new.code)));
            }

            let id = MemoryState::next_id(&self.working.coupons);
            let coupon = Coupon {
                id,
                code: new.code.clone(),
                user_id: new.user_id,
                offer_id: new.offer_id,
                reservation_id: Some(new.reservation_id),
                price_paid: new.price_paid,
                status: CouponStatus::Active,
                purchased_at: new.purchased_at,
                used_at: None,
                expires_at: new.expires_at,
            };
            self.working.coupons.insert(
                id,
                StoredCoupon {
                    coupon: coupon.clone(),
                    is_deleted: false,
                },
            );
            inserted.push(coupon);
        }

        Ok(inserted)
    }

    async fn coupons_by_user(&mut self, user_id: i32) -> StoreResult<Vec<Coupon>> {
        let mut coupons: Vec<Coupon> = self
            .working
            .coupons
            .values()
            .filter(|stored| !stored.is_deleted && stored.coupon.user_id == user_id)
            .map(|stored| stored.coupon.clone())
            .collect();
        coupons.sort_by(|a, b| b.purchased_at.cmp(&a.purchased_at).then(b.id.cmp(&a.id)));
        Ok(coupons)
    }

    async fn savepoint(&mut self) -> StoreResult<()> {
        self.savepoint = Some(self.working.clone());
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self) -> StoreResult<()> {
        let marked = self
            .savepoint
            .take()
            .ok_or_else(|| StoreError::Missing("savepoint".to_string()))?;
        self.working = marked;
        Ok(())
    }

    async fn release_savepoint(&mut self) -> StoreResult<()> {
        self.savepoint
            .take()
            .map(|_| ())
            .ok_or_else(|| StoreError::Missing("savepoint".to_string()))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork { mut guard, working, .. } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn user(id: i32, balance: Decimal) -> UserAccount {
        UserAccount {
            id,
            email: format!("user{}@example.com", id),
            display_name: format!("User {}", id),
            balance,
            is_active: true,
        }
    }

    fn new_reservation(user_id: i32, offer_id: i32) -> NewReservation {
        let now = Utc::now();
        NewReservation {
            user_id,
            offer_id,
            quantity: 1,
            reserved_at: now,
            expires_at: now + Duration::minutes(30),
        }
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_discarded() {
        let store = MemoryStore::new();
        store.put_user(user(1, dec!(10.00))).await;

        {
            let mut uow = store.begin().await.unwrap();
            uow.set_user_balance(1, dec!(0.00)).await.unwrap();
            // dropped without commit
        }

        assert_eq!(store.user(1).await.unwrap().balance, dec!(10.00));
    }

    #[tokio::test]
    async fn test_committed_writes_are_visible() {
        let store = MemoryStore::new();
        store.put_user(user(1, dec!(10.00))).await;

        let mut uow = store.begin().await.unwrap();
        uow.set_user_balance(1, dec!(4.00)).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(store.user(1).await.unwrap().balance, dec!(4.00));
    }

    #[tokio::test]
    async fn test_savepoint_rollback_keeps_earlier_writes() {
        let store = MemoryStore::new();
        store.put_user(user(1, dec!(10.00))).await;
        store.put_user(user(2, dec!(10.00))).await;

        let mut uow = store.begin().await.unwrap();
        uow.set_user_balance(1, dec!(5.00)).await.unwrap();

        uow.savepoint().await.unwrap();
        uow.set_user_balance(2, dec!(1.00)).await.unwrap();
        uow.rollback_to_savepoint().await.unwrap();

        uow.savepoint().await.unwrap();
        uow.set_user_balance(2, dec!(7.00)).await.unwrap();
        uow.release_savepoint().await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(store.user(1).await.unwrap().balance, dec!(5.00));
        assert_eq!(store.user(2).await.unwrap().balance, dec!(7.00));
    }

    #[tokio::test]
    async fn test_rollback_without_savepoint_fails() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        assert!(uow.rollback_to_savepoint().await.is_err());
    }

    #[tokio::test]
    async fn test_negative_balance_rejected() {
        let store = MemoryStore::new();
        store.put_user(user(1, dec!(10.00))).await;

        let mut uow = store.begin().await.unwrap();
        let result = uow.set_user_balance(1, dec!(-0.01)).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_second_active_reservation_rejected() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();

        let first = uow.insert_reservation(&new_reservation(1, 5)).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.status, ReservationStatus::Active);

        let second = uow.insert_reservation(&new_reservation(1, 5)).await;
        assert!(second.unwrap_err().violates(ACTIVE_RESERVATION_INDEX));

        // A different offer is fine
        assert!(uow.insert_reservation(&new_reservation(1, 6)).await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_coupon_codes_rejected() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let coupon = NewCoupon {
            code: "ABCDEFGHJKLM".to_string(),
            user_id: 1,
            offer_id: 1,
            reservation_id: 1,
            price_paid: dec!(5.00),
            purchased_at: now,
            expires_at: now,
        };

        let mut uow = store.begin().await.unwrap();
        let result = uow.insert_coupons(&[coupon.clone(), coupon]).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_soft_deleted_coupon_code_still_exists() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut uow = store.begin().await.unwrap();
        let inserted = uow
            .insert_coupons(&[NewCoupon {
                code: "QWERTYUIOP12".to_string(),
                user_id: 3,
                offer_id: 1,
                reservation_id: 1,
                price_paid: dec!(5.00),
                purchased_at: now,
                expires_at: now,
            }])
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert!(store.soft_delete_coupon(inserted[0].id).await);

        let mut uow = store.begin().await.unwrap();
        assert!(uow.coupon_code_exists("QWERTYUIOP12").await.unwrap());
        assert!(uow.coupons_by_user(3).await.unwrap().is_empty());
    }
}
