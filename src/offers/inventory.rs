// Inventory arithmetic on an offer's remaining coupons
// Keeps 0 <= remaining_coupons <= total_coupons for every hold and release.

use crate::offers::Offer;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("Insufficient coupons: requested {requested}, remaining {remaining}")]
    Insufficient { remaining: i32, requested: i32 },

    #[error("Releasing {released} coupons would exceed total {total} (remaining {remaining})")]
    Overflow {
        remaining: i32,
        released: i32,
        total: i32,
    },

    #[error("Quantity must be positive, got {0}")]
    NonPositive(i32),
}

impl Offer {
    /// Take `quantity` coupons out of the remaining pool
    pub fn reserve(&mut self, quantity: i32) -> Result<(), InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::NonPositive(quantity));
        }
        if self.remaining_coupons < quantity {
            return Err(InventoryError::Insufficient {
                remaining: self.remaining_coupons,
                requested: quantity,
            });
        }

        self.remaining_coupons -= quantity;
        Ok(())
    }

    /// Put `quantity` coupons back after a cancelled or expired hold
    pub fn release(&mut self, quantity: i32) -> Result<(), InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::NonPositive(quantity));
        }

        let restored = self
            .remaining_coupons
            .checked_add(quantity)
            .filter(|restored| *restored <= self.total_coupons)
            .ok_or(InventoryError::Overflow {
                remaining: self.remaining_coupons,
                released: quantity,
                total: self.total_coupons,
            })?;

        self.remaining_coupons = restored;
        Ok(())
    }
}
