use crate::reservations::ReservationStatus;

/// Guards reservation status transitions
pub struct StatusMachine;

impl StatusMachine {
    /// Check if a status transition is valid
    ///
    /// # Valid Transitions
    /// - Active → Completed (purchase)
    /// - Active → Cancelled (user cancellation)
    /// - Active → Expired (sweeper)
    ///
    /// Completed, Cancelled and Expired are terminal. Same-status transitions
    /// are rejected so a repeated cancel or expire cannot restore inventory twice.
    pub fn is_valid_transition(from: ReservationStatus, to: ReservationStatus) -> bool {
        matches!(
            (from, to),
            (ReservationStatus::Active, ReservationStatus::Completed)
                | (ReservationStatus::Active, ReservationStatus::Cancelled)
                | (ReservationStatus::Active, ReservationStatus::Expired)
        )
    }

    /// Attempt to transition from one status to another
    ///
    /// # Returns
    /// `Ok(to)` if the transition is valid, `Err(message)` otherwise
    pub fn transition(
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> Result<ReservationStatus, String> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(format!("Invalid status transition from {} to {}", from, to))
        }
    }
}
