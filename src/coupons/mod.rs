pub mod code_generator;
pub mod error;
pub mod handlers;
pub mod models;
pub mod service;

pub use code_generator::*;
pub use error::*;
pub use handlers::*;
pub use models::*;
pub use service::*;
