use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::ApiError;
use crate::state::AppState;
use crate::types::Clock;

/// Backing store for windowed per-source counters. The middleware depends
/// only on this trait; the in-memory map can be swapped for a shared cache.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Record a hit for `key` at `now`, expire entries older than `window`,
    /// and return the hit count now inside the window (including this one).
    async fn record(&self, key: &str, now: DateTime<Utc>, window: Duration) -> u32;
}

#[derive(Default)]
pub struct InMemoryRateLimitStore {
    hits: RwLock<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn tracked_sources(&self) -> usize {
        self.hits.read().await.len()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn record(&self, key: &str, now: DateTime<Utc>, window: Duration) -> u32 {
        let mut hits = self.hits.write().await;
        let window_start = now - window;

        // Evict sources whose entire history fell out of the window so the
        // map does not grow with every address ever seen
        hits.retain(|_, stamps| stamps.last().map_or(false, |at| *at > window_start));

        let entry = hits.entry(key.to_string()).or_default();
        entry.retain(|at| *at > window_start);
        entry.push(now);
        entry.len() as u32
    }
}

/// Windowed request limiter keyed by source address, applied to the
/// credential-guessing surface (login/register).
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
    enabled: bool,
    max_requests: u32,
    window: Duration,
    trust_proxy_headers: bool,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
        enabled: bool,
        max_requests: u32,
        window_secs: u64,
        trust_proxy_headers: bool,
    ) -> Self {
        Self {
            store,
            clock,
            enabled,
            max_requests,
            window: Duration::seconds(window_secs as i64),
            trust_proxy_headers,
        }
    }

    pub async fn check(&self, key: &str) -> Result<(), ApiError> {
        if !self.enabled {
            return Ok(());
        }

        let count = self.store.record(key, self.clock.now(), self.window).await;
        if count > self.max_requests {
            return Err(ApiError::TooManyRequests {
                retry_after_secs: self.window.num_seconds() as u64,
            });
        }
        Ok(())
    }

    /// Source key for the counters: the connection's peer address, with the
    /// first X-Forwarded-For hop taking precedence only when the process is
    /// configured to sit behind a proxy. A direct client cannot move itself
    /// into a fresh bucket by forging the header.
    pub fn client_key(&self, request: &Request) -> String {
        if self.trust_proxy_headers {
            if let Some(ip) = forwarded_for(request.headers()) {
                return ip;
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = state.rate_limiter.client_key(&request);
    state.rate_limiter.check(&key).await?;
    Ok(next.run(request).await)
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualClock;
    use axum::body::Body;

    fn limiter(clock: Arc<ManualClock>, max: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(
            Arc::new(InMemoryRateLimitStore::new()),
            clock,
            true,
            max,
            window_secs,
            false,
        )
    }

    fn request(peer: Option<&str>, xff: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(xff) = xff {
            builder = builder.header("x-forwarded-for", xff);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        if let Some(peer) = peer {
            let addr: SocketAddr = peer.parse().unwrap();
            request.extensions_mut().insert(ConnectInfo(addr));
        }
        request
    }

    #[tokio::test]
    async fn allows_up_to_max_then_rejects() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(clock, 3, 60);

        for _ in 0..3 {
            assert!(limiter.check("10.0.0.1").await.is_ok());
        }
        assert!(limiter.check("10.0.0.1").await.is_err());
        // Other sources are counted independently
        assert!(limiter.check("10.0.0.2").await.is_ok());
    }

    #[tokio::test]
    async fn window_expiry_frees_the_counter() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(clock.clone(), 2, 60);

        assert!(limiter.check("10.0.0.1").await.is_ok());
        assert!(limiter.check("10.0.0.1").await.is_ok());
        assert!(limiter.check("10.0.0.1").await.is_err());

        clock.advance(Duration::seconds(61));
        assert!(limiter.check("10.0.0.1").await.is_ok());
    }

    #[tokio::test]
    async fn disabled_limiter_never_rejects() {
        let clock = Arc::new(ManualClock::default());
        let limiter = RateLimiter::new(
            Arc::new(InMemoryRateLimitStore::new()),
            clock,
            false,
            1,
            60,
            false,
        );

        for _ in 0..10 {
            assert!(limiter.check("10.0.0.1").await.is_ok());
        }
    }

    #[tokio::test]
    async fn forged_headers_cannot_move_buckets() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(clock, 2, 60);

        // Rotating X-Forwarded-For values all resolve to the peer address
        // while proxy headers are untrusted
        for i in 0..2 {
            let key = limiter.client_key(&request(
                Some("10.0.0.1:9000"),
                Some(&format!("198.51.100.{}", i)),
            ));
            assert_eq!(key, "10.0.0.1");
            assert!(limiter.check(&key).await.is_ok());
        }
        let key = limiter.client_key(&request(Some("10.0.0.1:9000"), Some("203.0.113.99")));
        assert!(limiter.check(&key).await.is_err());
    }

    #[tokio::test]
    async fn peers_are_keyed_independently_without_proxy_headers() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(clock, 1, 60);

        let first = limiter.client_key(&request(Some("10.0.0.1:9000"), None));
        let second = limiter.client_key(&request(Some("10.0.0.2:9000"), None));
        assert_ne!(first, second);

        assert!(limiter.check(&first).await.is_ok());
        assert!(limiter.check(&first).await.is_err());
        // A different peer is unaffected by the first one's exhaustion
        assert!(limiter.check(&second).await.is_ok());
    }

    #[tokio::test]
    async fn trusted_proxy_uses_first_forwarded_hop() {
        let clock = Arc::new(ManualClock::default());
        let limiter = RateLimiter::new(
            Arc::new(InMemoryRateLimitStore::new()),
            clock,
            true,
            10,
            60,
            true,
        );

        let key = limiter.client_key(&request(
            Some("10.0.0.1:9000"),
            Some("203.0.113.7, 10.0.0.1"),
        ));
        assert_eq!(key, "203.0.113.7");

        // Without the header the peer address still applies
        let key = limiter.client_key(&request(Some("10.0.0.1:9000"), None));
        assert_eq!(key, "10.0.0.1");
    }

    #[tokio::test]
    async fn stale_sources_are_evicted() {
        let store = InMemoryRateLimitStore::new();
        let window = Duration::seconds(60);
        let start = Utc::now();

        store.record("10.0.0.1", start, window).await;
        store.record("10.0.0.2", start + Duration::seconds(61), window).await;

        assert_eq!(store.tracked_sources().await, 1);
    }
}
