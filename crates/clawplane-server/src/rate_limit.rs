//! Per-client token buckets.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex as TokioMutex;

/// Buckets untouched for this long are dropped once the map grows.
const IDLE_SECS: i64 = 5 * 60;
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: clawplane_core::settings::DEFAULT_RATE_LIMIT,
            burst: clawplane_core::settings::DEFAULT_RATE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Whole seconds until the next token, 0 when allowed.
    pub retry_after: u64,
}

struct TokenBucket {
    tokens: f64,
    max_tokens: f64,
    refill_rate: f64,
    last_refill: chrono::DateTime<chrono::Utc>,
}

impl TokenBucket {
    fn new(config: &RateLimitConfig) -> Self {
        Self {
            tokens: config.burst as f64,
            max_tokens: config.burst as f64,
            refill_rate: config.requests_per_minute as f64 / 60.0,
            last_refill: chrono::Utc::now(),
        }
    }

    fn refill(&mut self, now: chrono::DateTime<chrono::Utc>) {
        let elapsed = (now - self.last_refill).num_milliseconds() as f64 / 1000.0;
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;
    }

    fn try_consume(&mut self) -> bool {
        self.refill(chrono::Utc::now());
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn seconds_until_token(&self) -> u64 {
        if self.refill_rate <= 0.0 {
            return 60;
        }
        ((1.0 - self.tokens).max(0.0) / self.refill_rate).ceil() as u64
    }
}

pub struct RateLimiter {
    buckets: Arc<TokioMutex<HashMap<String, TokenBucket>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Arc::new(TokioMutex::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Takes one token from `key`'s bucket. A burst of 0 disables limiting.
    pub async fn check(&self, key: &str) -> RateDecision {
        if self.config.burst == 0 {
            return RateDecision {
                allowed: true,
                limit: 0,
                remaining: 0,
                retry_after: 0,
            };
        }

        let mut buckets = self.buckets.lock().await;
        if buckets.len() >= PRUNE_THRESHOLD {
            let cutoff = chrono::Utc::now() - chrono::Duration::seconds(IDLE_SECS);
            buckets.retain(|_, bucket| bucket.last_refill > cutoff);
        }

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(&self.config));
        let allowed = bucket.try_consume();
        RateDecision {
            allowed,
            limit: self.config.burst,
            remaining: bucket.tokens.floor() as u32,
            retry_after: if allowed { 0 } else { bucket.seconds_until_token() },
        }
    }
}
