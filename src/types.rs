/// Shared types used across the codebase
use chrono::{DateTime, Utc};

/// Time source injected into the lockout governor and the rate limiter so
/// that window expiry can be driven explicitly in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used by the running server.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
