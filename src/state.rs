use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::lockout::LoginAttemptGovernor;
use crate::auth::revocation::{InMemoryRevocationStore, RevocationStore};
use crate::auth::service::AuthService;
use crate::auth::tokens::TokenConfig;
use crate::config::{ApiConfig, AppConfig, SecurityConfig};
use crate::database::store::{AccountStore, PgAccountStore};
use crate::middleware::rate_limit::{InMemoryRateLimitStore, RateLimiter};
use crate::types::{Clock, SystemClock};

/// Shared application state carried by the router. Every seam (credential
/// store, revocation registry, time source, rate-limit store) is an
/// injectable trait object so tests can run against in-memory backings.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AccountStore>,
    pub revocations: Arc<dyn RevocationStore>,
    pub tokens: Arc<TokenConfig>,
    pub clock: Arc<dyn Clock>,
    pub auth: AuthService,
    pub rate_limiter: RateLimiter,
    /// Present when backed by Postgres; used by the health endpoint.
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AccountStore>,
        revocations: Arc<dyn RevocationStore>,
        clock: Arc<dyn Clock>,
        tokens: TokenConfig,
        security: &SecurityConfig,
        api: &ApiConfig,
        pool: Option<PgPool>,
    ) -> Self {
        let tokens = Arc::new(tokens);

        let governor = LoginAttemptGovernor::new(
            store.clone(),
            clock.clone(),
            security.max_failed_logins,
            security.lockout_minutes,
        );

        let auth = AuthService::new(
            store.clone(),
            revocations.clone(),
            tokens.clone(),
            clock.clone(),
            governor,
            security.bcrypt_cost,
        );

        let rate_limiter = RateLimiter::new(
            Arc::new(InMemoryRateLimitStore::new()),
            clock.clone(),
            api.enable_rate_limiting,
            api.rate_limit_requests,
            api.rate_limit_window_secs,
            api.trust_proxy_headers,
        );

        Self {
            store,
            revocations,
            tokens,
            clock,
            auth,
            rate_limiter,
            pool,
        }
    }

    /// Production wiring: Postgres credential store, in-memory revocation
    /// registry, wall clock.
    pub fn for_postgres(pool: PgPool, config: &AppConfig) -> Self {
        Self::new(
            Arc::new(PgAccountStore::new(pool.clone())),
            Arc::new(InMemoryRevocationStore::new()),
            Arc::new(SystemClock),
            TokenConfig::from_security(&config.security),
            &config.security,
            &config.api,
            Some(pool),
        )
    }
}
