// Time source for the reservation core
// Every expiry decision reads time through a Clock so tests can pin the instant.

use chrono::{DateTime, Duration, Utc};
use std::sync::RwLock;

/// Source of the current instant
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by `Utc::now()`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that stays at a set instant until moved
///
/// Used by tests to land exactly on expiry boundaries.
#[derive(Debug)]
pub struct FixedClock {
    time: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    /// Create a new fixed clock at the given time
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time: RwLock::new(time),
        }
    }

    /// Move the clock to an absolute instant
    pub fn set(&self, time: DateTime<Utc>) {
        let mut guard = self.time.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = time;
    }

    /// Move the clock forward by `delta`
    pub fn advance(&self, delta: Duration) {
        let mut guard = self.time.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.time.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
