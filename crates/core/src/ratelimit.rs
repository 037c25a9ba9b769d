//! Client-side rate limiting for platform calls
//!
//! Each route (an endpoint plus its major parameter, e.g. the channel ID) has
//! its own token bucket. Calls wait for a token before hitting the platform,
//! and a `RateLimited` answer from the platform is retried after the delay it
//! asks for.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};
use validator::Validate;

use crate::platform::{PlatformError, PlatformResult};

/// Rate limiter settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RateLimitConfig {
    /// Calls allowed per period on one route
    #[validate(range(min = 1, max = 1000))]
    pub capacity: u32,

    /// Time for a route's bucket to refill completely
    #[serde(with = "humantime_serde")]
    pub period: Duration,

    /// Retries after a `RateLimited` answer
    #[validate(range(min = 0, max = 10))]
    pub max_retries: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            period: Duration::from_secs(5),
            max_retries: 3,
        }
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn full(capacity: u32) -> Self {
        Self {
            tokens: f64::from(capacity),
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, config: &RateLimitConfig) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        let rate = f64::from(config.capacity) / config.period.as_secs_f64().max(f64::EPSILON);
        self.tokens = (self.tokens + elapsed * rate).min(f64::from(config.capacity));
        self.last_refill = now;
    }

    fn time_until_token(&self, config: &RateLimitConfig) -> Duration {
        let per_token = config.period.as_secs_f64() / f64::from(config.capacity);
        Duration::from_secs_f64(((1.0 - self.tokens) * per_token).max(0.0))
    }
}

/// Per-route token buckets
#[derive(Debug, Default)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: DashMap<String, Bucket>,
}

impl RateLimiter {
    /// Create a limiter
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    /// Build the bucket key for a route and its major parameter
    pub fn route(route: &str, major: impl fmt::Display) -> String {
        format!("{route}:{major}")
    }

    /// Wait until a call on `route` is allowed
    pub async fn acquire(&self, route: &str) {
        loop {
            let wait = {
                let mut bucket = self
                    .buckets
                    .entry(route.to_string())
                    .or_insert_with(|| Bucket::full(self.config.capacity));
                bucket.refill(&self.config);
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    None
                } else {
                    Some(bucket.time_until_token(&self.config))
                }
            };

            match wait {
                None => return,
                Some(delay) => {
                    debug!(route, ?delay, "rate limit bucket empty, waiting");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Run a platform call under the limiter
    ///
    /// # Errors
    ///
    /// Returns the call's error once it is not `RateLimited` or the retries
    /// are used up.
    pub async fn execute<T, F, Fut>(&self, route: &str, mut call: F) -> PlatformResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PlatformResult<T>>,
    {
        let mut attempt = 0;
        loop {
            self.acquire(route).await;
            match call().await {
                Err(PlatformError::RateLimited { retry_after }) if attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        route,
                        attempt,
                        ?retry_after,
                        "Rate limited by platform, retrying"
                    );
                    tokio::time::sleep(retry_after).await;
                }
                result => return result,
            }
        }
    }

    /// Number of routes seen so far
    #[must_use]
    pub fn tracked_routes(&self) -> usize {
        self.buckets.len()
    }
}
