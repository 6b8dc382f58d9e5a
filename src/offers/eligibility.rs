// Offer eligibility checks
//
// An offer can be reserved only while it is approved and today's date falls
// inside its validity window. The offer expiry sweeper flips lapsed offers to
// `Expired`, but this date check does not rely on it having run.

use chrono::NaiveDate;
use std::fmt;

use crate::offers::{Offer, OfferStatus};

/// Why an offer cannot currently be reserved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferUnavailable {
    /// Offer is not approved
    Status(OfferStatus),
    /// Validity window has not opened yet
    NotStarted(NaiveDate),
    /// Validity window closed
    Ended(NaiveDate),
}

impl fmt::Display for OfferUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferUnavailable::Status(status) => write!(f, "Offer status is {}", status),
            OfferUnavailable::NotStarted(start) => {
                write!(f, "Offer starts on {}", start.format("%Y-%m-%d"))
            }
            OfferUnavailable::Ended(end) => {
                write!(f, "Offer expired on {}", end.format("%Y-%m-%d"))
            }
        }
    }
}

impl Offer {
    /// Check status and validity window against `today` (UTC calendar date)
    ///
    /// Both window ends are inclusive at day granularity.
    pub fn check_reservable(&self, today: NaiveDate) -> Result<(), OfferUnavailable> {
        if self.status != OfferStatus::Approved {
            return Err(OfferUnavailable::Status(self.status));
        }

        let start = self.start_date.date_naive();
        if today < start {
            return Err(OfferUnavailable::NotStarted(start));
        }

        let end = self.end_date.date_naive();
        if today > end {
            return Err(OfferUnavailable::Ended(end));
        }

        Ok(())
    }
}
