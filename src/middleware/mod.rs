pub mod auth;
pub mod rate_limit;
pub mod response;
pub mod role;

pub use auth::{extract_bearer_token, require_auth, AuthUser};
pub use rate_limit::{rate_limit_middleware, InMemoryRateLimitStore, RateLimitStore, RateLimiter};
pub use response::{ApiResponse, ApiResult};
pub use role::require_role;
