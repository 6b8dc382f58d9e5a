use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Customer account as seen by the settlement process
///
/// Identity and credentials live with the identity service; this core only
/// reads the activity gate and debits `balance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserAccount {
    pub id: i32,
    pub email: String,
    pub display_name: String,
    pub balance: Decimal,
    pub is_active: bool,
}

impl UserAccount {
    /// Whether the account can cover `amount` without going negative
    pub fn can_afford(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }
}
