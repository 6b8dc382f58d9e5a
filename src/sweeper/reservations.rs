use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::reservations::Reservation;
use crate::store::{Store, StoreError, UnitOfWork};
use crate::sweeper::Sweep;

/// Outcome of one reservation sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub skipped: usize,
}

/// Expires lapsed holds and hands their coupons back to the offer
pub struct ReservationSweeper {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl ReservationSweeper {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// One pass over every active reservation whose `expires_at` has passed
    ///
    /// For each one the reserved quantity goes back to the offer and the
    /// reservation becomes `Expired`. Each item runs under its own savepoint:
    /// an item that fails is rolled back, logged and counted as skipped while
    /// the rest still go through. All surviving changes commit together.
    pub async fn sweep_once(&self) -> Result<SweepReport, StoreError> {
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;
        let lapsed = uow.lapsed_reservations(now).await?;

        if lapsed.is_empty() {
            debug!("No lapsed reservations");
            return Ok(SweepReport::default());
        }

        let mut report = SweepReport::default();

        for mut reservation in lapsed {
            if let Err(e) = reservation.expire() {
                warn!(reservation_id = reservation.id, error = %e, "Skipping reservation");
                report.skipped += 1;
                continue;
            }

            uow.savepoint().await?;
            match reclaim(uow.as_mut(), &reservation).await {
                Ok(()) => {
                    uow.release_savepoint().await?;
                    report.expired += 1;
                }
                Err(e) => {
                    error!(
                        reservation_id = reservation.id,
                        offer_id = reservation.offer_id,
                        error = %e,
                        "Failed to expire reservation, skipping"
                    );
                    uow.rollback_to_savepoint().await?;
                    report.skipped += 1;
                }
            }
        }

        uow.commit().await?;

        info!(
            expired = report.expired,
            skipped = report.skipped,
            "Expired lapsed reservations"
        );
        Ok(report)
    }
}

/// Restore the hold's coupons and persist its `Expired` status
///
/// A restore that would push the offer past its total is dropped; the hold is
/// still expired so it stops occupying the user's slot.
async fn reclaim(uow: &mut dyn UnitOfWork, reservation: &Reservation) -> Result<(), StoreError> {
    match uow.offer_for_update(reservation.offer_id).await? {
        Some(mut offer) => match offer.release(reservation.quantity) {
            Ok(()) => {
                uow.set_offer_remaining(offer.id, offer.remaining_coupons)
                    .await?
            }
            Err(e) => error!(
                reservation_id = reservation.id,
                offer_id = offer.id,
                error = %e,
                "Cannot restore inventory, expiring reservation without restore"
            ),
        },
        None => warn!(
            reservation_id = reservation.id,
            offer_id = reservation.offer_id,
            "Offer missing, expiring reservation without restore"
        ),
    }

    uow.set_reservation_status(reservation.id, reservation.status)
        .await
}

#[async_trait]
impl Sweep for ReservationSweeper {
    fn name(&self) -> &'static str {
        "reservation-sweeper"
    }

    async fn tick(&self) -> Result<usize, StoreError> {
        Ok(self.sweep_once().await?.expired)
    }
}
