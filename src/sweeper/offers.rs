use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::store::{Store, StoreError};
use crate::sweeper::Sweep;

/// Moves approved offers past their end date to `Expired`
pub struct OfferExpirySweeper {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl OfferExpirySweeper {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Expire every approved offer with `end_date <= now`; returns the count
    ///
    /// Outstanding holds on an expired offer are left for the reservation
    /// sweeper.
    pub async fn sweep_once(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;
        let lapsed = uow.lapsed_offers(now).await?;

        if lapsed.is_empty() {
            debug!("No offers past their end date");
            return Ok(0);
        }

        let mut expired = 0;
        for offer in lapsed {
            match offer.status.expire() {
                Ok(status) => {
                    uow.set_offer_status(offer.id, status).await?;
                    expired += 1;
                }
                Err(e) => warn!(offer_id = offer.id, error = %e, "Skipping offer"),
            }
        }

        uow.commit().await?;

        info!(expired, "Expired offers past their end date");
        Ok(expired)
    }
}

#[async_trait]
impl Sweep for OfferExpirySweeper {
    fn name(&self) -> &'static str {
        "offer-expiry-sweeper"
    }

    async fn tick(&self) -> Result<usize, StoreError> {
        self.sweep_once().await
    }
}
