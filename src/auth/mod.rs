pub mod lockout;
pub mod password;
pub mod revocation;
pub mod service;
pub mod tokens;

pub use lockout::LoginAttemptGovernor;
pub use revocation::{InMemoryRevocationStore, RevocationStore};
pub use service::AuthService;
pub use tokens::{AccessClaims, RefreshClaims, TokenConfig, TokenError};
