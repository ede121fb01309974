// ============================================================================
// Rate Limiting
// ============================================================================
//
// Fixed-window counters keyed by "{clientIp}-{upstreamHost}", consulted once
// per request before any cryptographic work.
//
// Discipline is increment-then-compare: every request bumps the counter and
// the request is allowed while the count is <= the quota. The window starts
// on the first hit for a key and the counter disappears when it ends.
//
// Backends:
// - Redis: one atomic Lua script (INCR, EXPIRE on first hit), shared by all
//   gateway instances
// - Memory: process-local, for single-instance deployments and tests
//
// ============================================================================

use async_trait::async_trait;
use delivery_config::{RateLimitBackend, RateLimitConfig};
use delivery_error::{AppError, AppResult};
use delivery_redis::RedisClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Answers "is this key still under its quota in the current window?"
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request for `key` and report whether it is allowed
    async fn check(&self, key: &str) -> AppResult<bool>;
}

/// Counter key for a client talking to a given backing host
pub fn rate_limit_key(client_ip: &str, upstream_host: &str) -> String {
    format!("{}-{}", client_ip, upstream_host)
}

/// Build the configured backend
pub async fn build_rate_limiter(config: &RateLimitConfig) -> anyhow::Result<Arc<dyn RateLimiter>> {
    match config.backend {
        RateLimitBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("REDIS_URL is required for the redis backend"))?;
            let client = RedisClient::connect(url).await?;
            tracing::info!(
                max_requests = config.max_requests,
                window_secs = config.window_secs,
                "Using Redis rate limiter"
            );
            Ok(Arc::new(RedisRateLimiter::new(client, config)))
        }
        RateLimitBackend::Memory => {
            tracing::warn!(
                "Using in-memory rate limiter: counters are not shared between gateway instances"
            );
            Ok(Arc::new(InMemoryRateLimiter::new(
                config.max_requests,
                Duration::from_secs(config.window_secs),
            )))
        }
    }
}

// ============================================================================
// Redis backend
// ============================================================================

pub struct RedisRateLimiter {
    client: RedisClient,
    key_prefix: String,
    max_requests: u32,
    window_secs: u64,
}

impl RedisRateLimiter {
    pub fn new(client: RedisClient, config: &RateLimitConfig) -> Self {
        Self {
            client,
            key_prefix: config.key_prefix.clone(),
            max_requests: config.max_requests,
            window_secs: config.window_secs,
        }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(&self, key: &str) -> AppResult<bool> {
        // Clones share the multiplexed connection
        let mut client = self.client.clone();
        let redis_key = format!("{}{}", self.key_prefix, key);
        let count = client
            .incr_with_expiry(&redis_key, self.window_secs)
            .await?;
        Ok(count <= i64::from(self.max_requests))
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Sweep expired windows once the map grows past this many keys
const SWEEP_THRESHOLD: usize = 10_000;

struct Window {
    started: Instant,
    count: u32,
}

struct Windows {
    by_key: HashMap<String, Window>,
    last_sweep: Instant,
}

pub struct InMemoryRateLimiter {
    max_requests: u32,
    window: Duration,
    sweep_threshold: usize,
    windows: Mutex<Windows>,
}

impl InMemoryRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            sweep_threshold: SWEEP_THRESHOLD,
            windows: Mutex::new(Windows {
                by_key: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, key: &str) -> AppResult<bool> {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        // At most one full pass per window, however many keys are live
        if windows.by_key.len() >= self.sweep_threshold
            && now.duration_since(windows.last_sweep) >= self.window
        {
            let window = self.window;
            windows
                .by_key
                .retain(|_, w| now.duration_since(w.started) < window);
            windows.last_sweep = now;
            tracing::debug!(live_keys = windows.by_key.len(), "Swept expired rate limit windows");
        }

        let entry = windows.by_key.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }
        entry.count = entry.count.saturating_add(1);

        Ok(entry.count <= self.max_requests)
    }
}

/// Consult the limiter, failing open on backend errors
///
/// Abuse shedding must not take delivery down with it, so a limiter that
/// cannot answer lets the request through and logs a warning.
pub async fn check_or_allow(limiter: &dyn RateLimiter, key: &str) -> AppResult<()> {
    match limiter.check(key).await {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::warn!(key = %key, "Rate limit exceeded");
            Err(AppError::RateLimited)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rate limiter unavailable, allowing request");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingLimiter;

    #[async_trait]
    impl RateLimiter for FailingLimiter {
        async fn check(&self, _key: &str) -> AppResult<bool> {
            Err(AppError::internal("backend down"))
        }
    }

    #[test]
    fn test_key_combines_ip_and_host() {
        assert_eq!(
            rate_limit_key("203.0.113.5", "objects.example.net"),
            "203.0.113.5-objects.example.net"
        );
    }

    #[tokio::test]
    async fn test_quota_then_reject() {
        let limiter = InMemoryRateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert!(limiter.check("ip-host").await.unwrap());
        }
        assert!(!limiter.check("ip-host").await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = InMemoryRateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("203.0.113.5-dev").await.unwrap());
        assert!(!limiter.check("203.0.113.5-dev").await.unwrap());
        assert!(limiter.check("203.0.113.5-prod").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets() {
        let limiter = InMemoryRateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check("k").await.unwrap());
        assert!(limiter.check("k").await.unwrap());
        assert!(!limiter.check("k").await.unwrap());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!limiter.check("k").await.unwrap());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.check("k").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_runs_at_most_once_per_window() {
        let limiter = InMemoryRateLimiter {
            sweep_threshold: 2,
            ..InMemoryRateLimiter::new(10, Duration::from_secs(60))
        };
        limiter.check("a").await.unwrap();
        limiter.check("b").await.unwrap();

        // Past the threshold, but the last sweep is less than a window old
        limiter.check("c").await.unwrap();
        assert_eq!(limiter.windows.lock().await.by_key.len(), 3);

        tokio::time::advance(Duration::from_secs(61)).await;
        limiter.check("d").await.unwrap();
        assert_eq!(limiter.windows.lock().await.by_key.len(), 1);

        // Fresh keys within the same window do not trigger another pass
        limiter.check("e").await.unwrap();
        limiter.check("f").await.unwrap();
        assert_eq!(limiter.windows.lock().await.by_key.len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_checks_do_not_lose_updates() {
        let limiter = Arc::new(InMemoryRateLimiter::new(50, Duration::from_secs(60)));
        let mut handles = Vec::new();
        for _ in 0..100 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.check("k").await.unwrap() }));
        }

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 50);
    }

    #[tokio::test]
    async fn test_backend_failure_fails_open() {
        assert!(check_or_allow(&FailingLimiter, "k").await.is_ok());
    }

    #[tokio::test]
    async fn test_exhausted_quota_is_rate_limited() {
        let limiter = InMemoryRateLimiter::new(0, Duration::from_secs(60));
        assert!(matches!(
            check_or_allow(&limiter, "k").await,
            Err(AppError::RateLimited)
        ));
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_redis_limiter() {
        let config = RateLimitConfig {
            backend: RateLimitBackend::Redis,
            max_requests: 2,
            window_secs: 60,
            redis_url: Some("redis://localhost:6379".to_string()),
            key_prefix: format!("test:rate:{}:", uuid::Uuid::new_v4()),
        };
        let limiter = build_rate_limiter(&config).await.unwrap();

        assert!(limiter.check("k").await.unwrap());
        assert!(limiter.check("k").await.unwrap());
        assert!(!limiter.check("k").await.unwrap());
    }
}
