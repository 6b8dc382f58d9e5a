// Platform policy module
// Read-only view of the global settings the reservation core depends on

pub mod error;
pub mod handlers;
pub mod models;
pub mod store;

pub use error::SettingsError;
pub use handlers::*;
pub use models::*;
pub use store::{PolicySource, SettingsStore, StaticPolicy};
