// Authentication module
// Verifies bearer JWTs issued by the identity service; this service never issues credentials

pub mod error;
pub mod middleware;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use middleware::AuthenticatedUser;
pub use token::{Claims, TokenService};
