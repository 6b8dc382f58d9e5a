// Background sweepers
//
// Each sweeper is a `Sweep` job driven by `run_periodic`. A tick that fails is
// logged and the next tick tries again; nothing a sweeper does is lost by
// skipping a round.

pub mod offers;
pub mod reservations;

pub use offers::OfferExpirySweeper;
pub use reservations::{ReservationSweeper, SweepReport};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::store::StoreError;

/// A unit of background work run on a fixed period
#[async_trait]
pub trait Sweep: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Run one pass, returning how many records changed
    async fn tick(&self) -> Result<usize, StoreError>;
}

/// Run `job` every `period` until `shutdown` flips to `true`
///
/// The first pass runs immediately. Ticks missed while a pass was running are
/// delayed rather than fired in a burst.
pub async fn run_periodic(job: Arc<dyn Sweep>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(job = job.name(), period_secs = period.as_secs(), "Sweeper started");

    while !*shutdown.borrow() {
        tokio::select! {
            _ = interval.tick() => {
                let span = info_span!("sweep", job = job.name(), tick_id = %Uuid::new_v4());
                if let Err(e) = job.tick().instrument(span).await {
                    error!(job = job.name(), error = %e, "Sweep failed, retrying next tick");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() {
                    // Sender dropped; treat as shutdown
                    break;
                }
            }
        }
    }

    info!(job = job.name(), "Sweeper stopped");
}
