use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::coupons::{CouponCodeGenerator, NewCoupon};
use crate::reservations::{
    CreateReservationRequest, NewReservation, PriceCalculator, PurchaseResponse, Reservation,
    ReservationError, ReservationStatus, ReservationView,
};
use crate::settings::PolicySource;
use crate::store::{Store, UnitOfWork};

/// Service for reservation business logic
///
/// Each public operation runs in one unit of work: every precondition is
/// checked before the first write, and all writes commit together.
#[derive(Clone)]
pub struct ReservationService {
    store: Arc<dyn Store>,
    policy: Arc<dyn PolicySource>,
    clock: Arc<dyn Clock>,
    codes: CouponCodeGenerator,
}

impl ReservationService {
    /// Create a new ReservationService
    pub fn new(store: Arc<dyn Store>, policy: Arc<dyn PolicySource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            policy,
            clock,
            codes: CouponCodeGenerator::default(),
        }
    }

    /// Place a hold on `request.quantity` coupons of an offer
    ///
    /// # Preconditions (first failure wins)
    /// 1. User exists and is active
    /// 2. Offer exists
    /// 3. Offer is approved
    /// 4. Today is on or after the offer's start date
    /// 5. Today is on or before the offer's end date
    /// 6. Enough coupons remain
    /// 7. User holds no other active reservation for the offer
    ///
    /// # Effect
    /// Decrements the offer's remaining coupons and creates an active
    /// reservation expiring after the policy's reservation duration.
    pub async fn create_reservation(
        &self,
        user_id: i32,
        request: CreateReservationRequest,
    ) -> Result<ReservationView, ReservationError> {
        let CreateReservationRequest { offer_id, quantity } = request;
        if quantity < 1 {
            return Err(ReservationError::ValidationError(format!(
                "Quantity must be at least 1, got {}",
                quantity
            )));
        }

        let now = self.clock.now();
        let policy = self.policy.policy().await?;
        let mut uow = self.store.begin().await?;

        let user = uow
            .user_for_update(user_id)
            .await?
            .ok_or_else(|| ReservationError::not_found("User", user_id))?;
        if !user.is_active {
            return Err(ReservationError::AccountInactive);
        }

        let mut offer = uow
            .offer_for_update(offer_id)
            .await?
            .ok_or_else(|| ReservationError::not_found("Offer", offer_id))?;
        offer.check_reservable(now.date_naive())?;
        offer.reserve(quantity)?;

        if uow.active_reservation(user_id, offer_id).await?.is_some() {
            return Err(ReservationError::DuplicateReservation);
        }

        uow.set_offer_remaining(offer.id, offer.remaining_coupons)
            .await?;
        let reservation = uow
            .insert_reservation(&NewReservation {
                user_id,
                offer_id,
                quantity,
                reserved_at: now,
                expires_at: now + policy.reservation_duration(),
            })
            .await?;
        let details = uow
            .offer_details(offer_id)
            .await?
            .ok_or_else(|| ReservationError::not_found("Offer", offer_id))?;

        uow.commit().await?;

        info!(
            reservation_id = reservation.id,
            user_id,
            offer_id,
            quantity,
            remaining_coupons = offer.remaining_coupons,
            "Reservation created"
        );
        Ok(ReservationView::build(&reservation, &details, now))
    }

    /// Settle an active reservation: debit the balance and mint its coupons
    ///
    /// # Preconditions (first failure wins)
    /// 1. User exists and is active
    /// 2. Reservation exists and belongs to the user
    /// 3. Reservation is active
    /// 4. Reservation has not reached its expiry instant
    /// 5. Offer exists
    /// 6. Balance covers `discounted_price * quantity`
    ///
    /// An expired hold is only rejected here; the sweeper restores its inventory.
    pub async fn purchase_reservation(
        &self,
        user_id: i32,
        reservation_id: i32,
    ) -> Result<PurchaseResponse, ReservationError> {
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        let user = uow
            .user_for_update(user_id)
            .await?
            .ok_or_else(|| ReservationError::not_found("User", user_id))?;
        if !user.is_active {
            return Err(ReservationError::AccountInactive);
        }

        let mut reservation = owned_reservation(uow.as_mut(), user_id, reservation_id, true).await?;
        if reservation.status != ReservationStatus::Active {
            return Err(ReservationError::InvalidStatus {
                actual: reservation.status,
                expected: ReservationStatus::Active,
            });
        }
        if reservation.is_lapsed(now) {
            return Err(ReservationError::ReservationExpired);
        }

        let offer = uow
            .offer_details(reservation.offer_id)
            .await?
            .ok_or_else(|| ReservationError::not_found("Offer", reservation.offer_id))?
            .offer;

        let total = PriceCalculator::total_price(offer.discounted_price, reservation.quantity);
        if !user.can_afford(total) {
            return Err(ReservationError::InsufficientBalance {
                required: total,
                available: user.balance,
            });
        }

        let codes = self
            .codes
            .issue_codes(uow.as_mut(), reservation.quantity as usize)
            .await?;
        let coupons: Vec<NewCoupon> = codes
            .iter()
            .map(|code| NewCoupon {
                code: code.clone(),
                user_id,
                offer_id: offer.id,
                reservation_id: reservation.id,
                price_paid: offer.discounted_price,
                purchased_at: now,
                expires_at: offer.end_date,
            })
            .collect();

        let remaining_balance = user.balance - total;
        reservation
            .complete()
            .map_err(ReservationError::BusinessRuleViolation)?;

        uow.set_user_balance(user.id, remaining_balance).await?;
        uow.insert_coupons(&coupons).await?;
        uow.set_reservation_status(reservation.id, reservation.status)
            .await?;
        uow.commit().await?;

        info!(
            reservation_id = reservation.id,
            user_id,
            coupons = codes.len(),
            total_paid = %total,
            "Reservation purchased"
        );
        Ok(PurchaseResponse {
            reservation_id: reservation.id,
            coupon_codes: codes,
            total_paid: total,
            remaining_balance,
        })
    }

    /// Cancel an active reservation and return its coupons to the offer
    ///
    /// If the offer no longer exists the restore is skipped and the
    /// cancellation still goes through.
    pub async fn cancel_reservation(
        &self,
        user_id: i32,
        reservation_id: i32,
    ) -> Result<(), ReservationError> {
        let mut uow = self.store.begin().await?;

        let mut reservation = owned_reservation(uow.as_mut(), user_id, reservation_id, true).await?;
        let previous = reservation.status;
        reservation.cancel().map_err(|_| {
            ReservationError::BusinessRuleViolation(format!(
                "Cannot cancel a {} reservation",
                previous
            ))
        })?;

        match uow.offer_for_update(reservation.offer_id).await? {
            Some(mut offer) => {
                offer.release(reservation.quantity)?;
                uow.set_offer_remaining(offer.id, offer.remaining_coupons)
                    .await?;
            }
            None => debug!(
                reservation_id,
                offer_id = reservation.offer_id,
                "Offer gone, skipping inventory restore"
            ),
        }

        uow.set_reservation_status(reservation.id, reservation.status)
            .await?;
        uow.commit().await?;

        info!(reservation_id, user_id, quantity = reservation.quantity, "Reservation cancelled");
        Ok(())
    }

    /// Get one of the user's reservations
    pub async fn get_reservation(
        &self,
        user_id: i32,
        reservation_id: i32,
    ) -> Result<ReservationView, ReservationError> {
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        let reservation = owned_reservation(uow.as_mut(), user_id, reservation_id, false).await?;
        let details = uow
            .offer_details(reservation.offer_id)
            .await?
            .ok_or_else(|| ReservationError::not_found("Offer", reservation.offer_id))?;

        Ok(ReservationView::build(&reservation, &details, now))
    }

    /// All reservations of a user, newest first
    ///
    /// Reservations whose offer has been removed are left out.
    pub async fn get_user_reservations(
        &self,
        user_id: i32,
    ) -> Result<Vec<ReservationView>, ReservationError> {
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        let reservations = uow.reservations_by_user(user_id).await?;
        let mut offers = HashMap::new();
        let mut views = Vec::with_capacity(reservations.len());

        for reservation in &reservations {
            if !offers.contains_key(&reservation.offer_id) {
                let details = uow.offer_details(reservation.offer_id).await?;
                offers.insert(reservation.offer_id, details);
            }
            match offers.get(&reservation.offer_id).and_then(Option::as_ref) {
                Some(details) => views.push(ReservationView::build(reservation, details, now)),
                None => warn!(
                    reservation_id = reservation.id,
                    offer_id = reservation.offer_id,
                    "Offer missing for reservation, leaving it out of the listing"
                ),
            }
        }

        Ok(views)
    }
}

/// Load a reservation and check ownership; a foreign reservation reads as missing
async fn owned_reservation(
    uow: &mut dyn UnitOfWork,
    user_id: i32,
    reservation_id: i32,
    for_update: bool,
) -> Result<Reservation, ReservationError> {
    let reservation = if for_update {
        uow.reservation_for_update(reservation_id).await?
    } else {
        uow.find_reservation(reservation_id).await?
    };

    reservation
        .filter(|r| r.user_id == user_id)
        .ok_or_else(|| ReservationError::not_found("Reservation", reservation_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::coupons::is_well_formed;
    use crate::models::UserAccount;
    use crate::offers::{Offer, OfferStatus};
    use crate::settings::{Policy, StaticPolicy};
    use crate::store::MemoryStore;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    const MERCHANT: i32 = 1;
    const ALICE: i32 = 2;
    const BOB: i32 = 3;
    const INACTIVE: i32 = 4;
    const OFFER: i32 = 10;

    struct Fixture {
        service: ReservationService,
        store: MemoryStore,
        clock: Arc<FixedClock>,
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn account(id: i32, balance: Decimal, is_active: bool) -> UserAccount {
        UserAccount {
            id,
            email: format!("user{}@example.com", id),
            display_name: format!("User {}", id),
            balance,
            is_active,
        }
    }

    fn offer(id: i32, price: Decimal, remaining: i32) -> Offer {
        Offer {
            id,
            merchant_id: MERCHANT,
            category_id: None,
            title: format!("Offer {}", id),
            status: OfferStatus::Approved,
            original_price: price * dec!(2),
            discounted_price: price,
            start_date: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 59).unwrap(),
            total_coupons: 100,
            remaining_coupons: remaining,
        }
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let mut merchant = account(MERCHANT, Decimal::ZERO, true);
        merchant.display_name = "Cafe Nord".to_string();
        store.put_user(merchant).await;
        store.put_user(account(ALICE, dec!(500.00), true)).await;
        store.put_user(account(BOB, dec!(500.00), true)).await;
        store.put_user(account(INACTIVE, dec!(500.00), false)).await;
        store.put_offer(offer(OFFER, dec!(40.00), 100)).await;

        let clock = Arc::new(FixedClock::new(start()));
        let service = ReservationService::new(
            Arc::new(store.clone()),
            Arc::new(StaticPolicy(Policy::default())),
            clock.clone(),
        );

        Fixture {
            service,
            store,
            clock,
        }
    }

    fn request(offer_id: i32, quantity: i32) -> CreateReservationRequest {
        CreateReservationRequest { offer_id, quantity }
    }

    #[tokio::test]
    async fn test_reserve_then_purchase() {
        let f = fixture().await;

        let view = f
            .service
            .create_reservation(ALICE, request(OFFER, 5))
            .await
            .unwrap();
        assert_eq!(view.status, ReservationStatus::Active);
        assert_eq!(view.expires_at, start() + Duration::minutes(30));
        assert_eq!(view.minutes_remaining, 30);
        assert!(!view.is_expired);
        assert_eq!(view.total_price, dec!(200.00));
        assert_eq!(view.merchant_name, "Cafe Nord");
        assert_eq!(f.store.offer(OFFER).await.unwrap().remaining_coupons, 95);

        let purchase = f.service.purchase_reservation(ALICE, view.id).await.unwrap();
        assert_eq!(purchase.coupon_codes.len(), 5);
        assert!(purchase.coupon_codes.iter().all(|c| is_well_formed(c)));
        let distinct: HashSet<&String> = purchase.coupon_codes.iter().collect();
        assert_eq!(distinct.len(), 5);
        assert_eq!(purchase.total_paid, dec!(200.00));
        assert_eq!(purchase.remaining_balance, dec!(300.00));

        assert_eq!(f.store.user(ALICE).await.unwrap().balance, dec!(300.00));
        assert_eq!(
            f.store.reservation(view.id).await.unwrap().status,
            ReservationStatus::Completed
        );
        // Inventory was taken at hold time, not again at purchase
        assert_eq!(f.store.offer(OFFER).await.unwrap().remaining_coupons, 95);

        let coupons = f.store.coupons().await;
        assert_eq!(coupons.len(), 5);
        for coupon in &coupons {
            assert_eq!(coupon.price_paid, dec!(40.00));
            assert_eq!(coupon.expires_at, offer(OFFER, dec!(40.00), 100).end_date);
            assert_eq!(coupon.reservation_id, Some(view.id));
        }
        let minted: Vec<String> = coupons.iter().map(|c| c.code.clone()).collect();
        assert_eq!(minted, purchase.coupon_codes);
    }

    #[tokio::test]
    async fn test_concurrent_holds_never_oversell() {
        let f = fixture().await;

        let (first, second) = tokio::join!(
            f.service.create_reservation(ALICE, request(OFFER, 60)),
            f.service.create_reservation(BOB, request(OFFER, 50)),
        );

        let successes = [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);

        let failure = first.err().or(second.err()).unwrap();
        match failure {
            ReservationError::InsufficientCoupons {
                remaining,
                requested,
            } => {
                assert!(remaining == 40 || remaining == 50);
                assert!(requested == 50 || requested == 60);
            }
            other => panic!("expected InsufficientCoupons, got {:?}", other),
        }

        let remaining = f.store.offer(OFFER).await.unwrap().remaining_coupons;
        assert!(remaining == 40 || remaining == 50);
    }

    #[tokio::test]
    async fn test_second_hold_on_same_offer_is_duplicate() {
        let f = fixture().await;
        f.service
            .create_reservation(ALICE, request(OFFER, 2))
            .await
            .unwrap();

        let result = f.service.create_reservation(ALICE, request(OFFER, 1)).await;
        assert!(matches!(result, Err(ReservationError::DuplicateReservation)));
        assert_eq!(f.store.offer(OFFER).await.unwrap().remaining_coupons, 98);
    }

    #[tokio::test]
    async fn test_capacity_checked_before_duplicate() {
        let f = fixture().await;
        f.service
            .create_reservation(ALICE, request(OFFER, 2))
            .await
            .unwrap();

        let result = f.service.create_reservation(ALICE, request(OFFER, 99)).await;
        assert!(matches!(
            result,
            Err(ReservationError::InsufficientCoupons {
                remaining: 98,
                requested: 99
            })
        ));
    }

    #[tokio::test]
    async fn test_insufficient_balance_leaves_hold_active() {
        let f = fixture().await;
        f.store.put_user(account(BOB, dec!(50.00), true)).await;
        f.store.put_offer(offer(11, dec!(50.00), 100)).await;

        let view = f
            .service
            .create_reservation(BOB, request(11, 2))
            .await
            .unwrap();
        let result = f.service.purchase_reservation(BOB, view.id).await;

        match result {
            Err(ReservationError::InsufficientBalance {
                required,
                available,
            }) => {
                assert_eq!(required, dec!(100.00));
                assert_eq!(available, dec!(50.00));
            }
            other => panic!("expected InsufficientBalance, got {:?}", other),
        }
        assert_eq!(
            f.store.reservation(view.id).await.unwrap().status,
            ReservationStatus::Active
        );
        assert_eq!(f.store.user(BOB).await.unwrap().balance, dec!(50.00));
        assert!(f.store.coupons().await.is_empty());

        // Still purchasable once funds arrive
        f.store.put_user(account(BOB, dec!(100.00), true)).await;
        let purchase = f.service.purchase_reservation(BOB, view.id).await.unwrap();
        assert_eq!(purchase.remaining_balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_reserve_exactly_remaining() {
        let f = fixture().await;
        f.store.put_offer(offer(12, dec!(5.00), 7)).await;

        f.service
            .create_reservation(ALICE, request(12, 7))
            .await
            .unwrap();
        assert_eq!(f.store.offer(12).await.unwrap().remaining_coupons, 0);
    }

    #[tokio::test]
    async fn test_purchase_at_expiry_instant_is_expired() {
        let f = fixture().await;
        let view = f
            .service
            .create_reservation(ALICE, request(OFFER, 1))
            .await
            .unwrap();

        f.clock.set(view.expires_at - Duration::seconds(1));
        let still_valid = f.service.get_reservation(ALICE, view.id).await.unwrap();
        assert!(!still_valid.is_expired);

        f.clock.set(view.expires_at);
        let result = f.service.purchase_reservation(ALICE, view.id).await;
        assert!(matches!(result, Err(ReservationError::ReservationExpired)));
        // Rejected only; restoring inventory is the sweeper's job
        assert_eq!(
            f.store.reservation(view.id).await.unwrap().status,
            ReservationStatus::Active
        );
        assert_eq!(f.store.offer(OFFER).await.unwrap().remaining_coupons, 99);
    }

    #[tokio::test]
    async fn test_cancel_twice_restores_once() {
        let f = fixture().await;
        let view = f
            .service
            .create_reservation(ALICE, request(OFFER, 4))
            .await
            .unwrap();

        f.service.cancel_reservation(ALICE, view.id).await.unwrap();
        assert_eq!(f.store.offer(OFFER).await.unwrap().remaining_coupons, 100);

        let second = f.service.cancel_reservation(ALICE, view.id).await;
        match second {
            Err(ReservationError::BusinessRuleViolation(msg)) => {
                assert_eq!(msg, "Cannot cancel a cancelled reservation")
            }
            other => panic!("expected BusinessRuleViolation, got {:?}", other),
        }
        assert_eq!(f.store.offer(OFFER).await.unwrap().remaining_coupons, 100);
    }

    #[tokio::test]
    async fn test_cancel_frees_slot_for_new_hold() {
        let f = fixture().await;
        let view = f
            .service
            .create_reservation(ALICE, request(OFFER, 4))
            .await
            .unwrap();
        f.service.cancel_reservation(ALICE, view.id).await.unwrap();

        assert!(f
            .service
            .create_reservation(ALICE, request(OFFER, 4))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_cancel_with_missing_offer_still_cancels() {
        let f = fixture().await;
        let view = f
            .service
            .create_reservation(ALICE, request(OFFER, 3))
            .await
            .unwrap();
        f.store.remove_offer(OFFER).await;

        f.service.cancel_reservation(ALICE, view.id).await.unwrap();
        assert_eq!(
            f.store.reservation(view.id).await.unwrap().status,
            ReservationStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_cancel_completed_reservation_rejected() {
        let f = fixture().await;
        let view = f
            .service
            .create_reservation(ALICE, request(OFFER, 1))
            .await
            .unwrap();
        f.service.purchase_reservation(ALICE, view.id).await.unwrap();

        let result = f.service.cancel_reservation(ALICE, view.id).await;
        assert!(matches!(result, Err(ReservationError::BusinessRuleViolation(_))));
        assert_eq!(f.store.offer(OFFER).await.unwrap().remaining_coupons, 99);
    }

    #[tokio::test]
    async fn test_purchase_cancelled_reservation_is_invalid_status() {
        let f = fixture().await;
        let view = f
            .service
            .create_reservation(ALICE, request(OFFER, 1))
            .await
            .unwrap();
        f.service.cancel_reservation(ALICE, view.id).await.unwrap();

        let result = f.service.purchase_reservation(ALICE, view.id).await;
        assert!(matches!(
            result,
            Err(ReservationError::InvalidStatus {
                actual: ReservationStatus::Cancelled,
                expected: ReservationStatus::Active
            })
        ));
    }

    #[tokio::test]
    async fn test_purchase_by_inactive_account_rejected() {
        let f = fixture().await;
        let view = f
            .service
            .create_reservation(ALICE, request(OFFER, 2))
            .await
            .unwrap();
        f.store.put_user(account(ALICE, dec!(500.00), false)).await;

        let result = f.service.purchase_reservation(ALICE, view.id).await;

        assert!(matches!(result, Err(ReservationError::AccountInactive)));
        assert_eq!(f.store.user(ALICE).await.unwrap().balance, dec!(500.00));
        assert!(f.store.coupons().await.is_empty());
        assert_eq!(
            f.store.reservation(view.id).await.unwrap().status,
            ReservationStatus::Active
        );
    }

    #[tokio::test]
    async fn test_purchase_with_missing_offer_is_not_found() {
        let f = fixture().await;
        let view = f
            .service
            .create_reservation(ALICE, request(OFFER, 2))
            .await
            .unwrap();
        f.store.remove_offer(OFFER).await;

        let result = f.service.purchase_reservation(ALICE, view.id).await;

        assert!(matches!(
            result,
            Err(ReservationError::NotFound { resource: "Offer", id: OFFER })
        ));
        assert_eq!(f.store.user(ALICE).await.unwrap().balance, dec!(500.00));
        assert!(f.store.coupons().await.is_empty());
        assert_eq!(
            f.store.reservation(view.id).await.unwrap().status,
            ReservationStatus::Active
        );
    }

    #[tokio::test]
    async fn test_foreign_reservation_reads_as_missing() {
        let f = fixture().await;
        let view = f
            .service
            .create_reservation(ALICE, request(OFFER, 1))
            .await
            .unwrap();

        assert!(matches!(
            f.service.purchase_reservation(BOB, view.id).await,
            Err(ReservationError::NotFound { resource: "Reservation", .. })
        ));
        assert!(matches!(
            f.service.cancel_reservation(BOB, view.id).await,
            Err(ReservationError::NotFound { .. })
        ));
        assert!(matches!(
            f.service.get_reservation(BOB, view.id).await,
            Err(ReservationError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_user_checks_come_first() {
        let f = fixture().await;

        assert!(matches!(
            f.service.create_reservation(99, request(999, 1)).await,
            Err(ReservationError::NotFound { resource: "User", id: 99 })
        ));
        assert!(matches!(
            f.service.create_reservation(INACTIVE, request(999, 1)).await,
            Err(ReservationError::AccountInactive)
        ));
        assert!(matches!(
            f.service.create_reservation(ALICE, request(999, 1)).await,
            Err(ReservationError::NotFound { resource: "Offer", id: 999 })
        ));
    }

    #[tokio::test]
    async fn test_offer_availability_reasons() {
        let f = fixture().await;
        let mut pending = offer(20, dec!(10.00), 10);
        pending.status = OfferStatus::Pending;
        f.store.put_offer(pending).await;

        let mut future = offer(21, dec!(10.00), 10);
        future.start_date = Utc.with_ymd_and_hms(2024, 6, 11, 0, 0, 0).unwrap();
        f.store.put_offer(future).await;

        let mut past = offer(22, dec!(10.00), 10);
        past.end_date = Utc.with_ymd_and_hms(2024, 6, 9, 23, 0, 0).unwrap();
        f.store.put_offer(past).await;

        let reason = |result: Result<ReservationView, ReservationError>| match result {
            Err(ReservationError::OfferNotAvailable(reason)) => reason,
            other => panic!("expected OfferNotAvailable, got {:?}", other),
        };

        assert_eq!(
            reason(f.service.create_reservation(ALICE, request(20, 1)).await),
            "Offer status is pending"
        );
        assert_eq!(
            reason(f.service.create_reservation(ALICE, request(21, 1)).await),
            "Offer starts on 2024-06-11"
        );
        assert_eq!(
            reason(f.service.create_reservation(ALICE, request(22, 1)).await),
            "Offer expired on 2024-06-09"
        );
    }

    #[tokio::test]
    async fn test_policy_duration_applies() {
        let f = fixture().await;
        let service = ReservationService::new(
            Arc::new(f.store.clone()),
            Arc::new(StaticPolicy(Policy {
                reservation_duration_minutes: 5,
                merchant_edit_window_hours: 24,
            })),
            f.clock.clone(),
        );

        let view = service
            .create_reservation(ALICE, request(OFFER, 1))
            .await
            .unwrap();
        assert_eq!(view.expires_at, start() + Duration::minutes(5));
    }

    #[tokio::test]
    async fn test_user_reservations_newest_first() {
        let f = fixture().await;
        f.store.put_offer(offer(11, dec!(1.00), 100)).await;

        let older = f
            .service
            .create_reservation(ALICE, request(OFFER, 1))
            .await
            .unwrap();
        f.clock.advance(Duration::minutes(1));
        let newer = f
            .service
            .create_reservation(ALICE, request(11, 1))
            .await
            .unwrap();
        f.service
            .create_reservation(BOB, request(11, 1))
            .await
            .unwrap();

        let views = f.service.get_user_reservations(ALICE).await.unwrap();
        let ids: Vec<i32> = views.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        assert_eq!(views[1].minutes_remaining, 29);
    }
}
