pub mod eligibility;
pub mod inventory;
pub mod models;

pub use eligibility::*;
pub use inventory::*;
pub use models::*;
