use std::sync::Arc;

use crate::coupons::{Coupon, CouponError};
use crate::store::Store;

/// Read access to a user's purchased coupons
#[derive(Clone)]
pub struct CouponService {
    store: Arc<dyn Store>,
}

impl CouponService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Coupons owned by the user, newest purchase first; soft-deleted ones are hidden
    pub async fn get_user_coupons(&self, user_id: i32) -> Result<Vec<Coupon>, CouponError> {
        let mut uow = self.store.begin().await?;
        let coupons = uow.coupons_by_user(user_id).await?;
        Ok(coupons)
    }
}
