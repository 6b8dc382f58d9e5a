use chrono::Duration;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::settings::error::SettingsError;

pub const DEFAULT_RESERVATION_DURATION_MINUTES: i32 = 30;
pub const DEFAULT_MERCHANT_EDIT_WINDOW_HOURS: i32 = 24;

/// Platform-wide policy consumed by the reservation core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Policy {
    /// How long a hold lasts before the sweeper may reclaim it
    #[schema(example = 30)]
    pub reservation_duration_minutes: i32,
    /// Read-only here; merchants' edit window is enforced elsewhere
    #[schema(example = 24)]
    pub merchant_edit_window_hours: i32,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            reservation_duration_minutes: DEFAULT_RESERVATION_DURATION_MINUTES,
            merchant_edit_window_hours: DEFAULT_MERCHANT_EDIT_WINDOW_HOURS,
        }
    }
}

impl Policy {
    /// Check value ranges
    ///
    /// # Rules
    /// - `reservation_duration_minutes` must be at least 1
    /// - `merchant_edit_window_hours` must not be negative
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.reservation_duration_minutes < 1 {
            return Err(SettingsError::InvalidPolicy(format!(
                "reservation_duration_minutes must be at least 1, got {}",
                self.reservation_duration_minutes
            )));
        }
        if self.merchant_edit_window_hours < 0 {
            return Err(SettingsError::InvalidPolicy(format!(
                "merchant_edit_window_hours must not be negative, got {}",
                self.merchant_edit_window_hours
            )));
        }
        Ok(())
    }

    pub fn reservation_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.reservation_duration_minutes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = Policy::default();
        assert_eq!(policy.reservation_duration_minutes, 30);
        assert_eq!(policy.merchant_edit_window_hours, 24);
        assert!(policy.validate().is_ok());
        assert_eq!(policy.reservation_duration(), Duration::minutes(30));
    }

    #[test]
    fn test_zero_duration_rejected() {
        let policy = Policy {
            reservation_duration_minutes: 0,
            merchant_edit_window_hours: 24,
        };
        assert!(matches!(policy.validate(), Err(SettingsError::InvalidPolicy(_))));
    }

    #[test]
    fn test_negative_edit_window_rejected() {
        let policy = Policy {
            reservation_duration_minutes: 15,
            merchant_edit_window_hours: -1,
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_zero_edit_window_allowed() {
        let policy = Policy {
            reservation_duration_minutes: 1,
            merchant_edit_window_hours: 0,
        };
        assert!(policy.validate().is_ok());
    }
}
