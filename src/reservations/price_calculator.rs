use rust_decimal::Decimal;

/// Settlement price arithmetic
pub struct PriceCalculator;

impl PriceCalculator {
    /// Total owed for a hold
    ///
    /// # Arguments
    /// * `unit_price` - Offer's discounted price per coupon
    /// * `quantity` - Number of coupons held
    ///
    /// # Returns
    /// `unit_price * quantity`
    pub fn total_price(unit_price: Decimal, quantity: i32) -> Decimal {
        unit_price * Decimal::from(quantity)
    }
}
