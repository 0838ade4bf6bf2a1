//! Sliding-window rate limiter.

use super::store::WindowStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Rate-limit window configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in milliseconds.
    pub window_ms: u64,
    /// Maximum admitted requests per key within the window.
    pub limit: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { window_ms: 60_000, limit: 20 }
    }
}

/// Structured allow/deny decision. The limiter never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    /// Whether the request was admitted.
    pub allowed: bool,
    /// Admissions left in the current window (0 when denied).
    pub remaining: u32,
    /// On denial, milliseconds until the oldest blocking timestamp falls out
    /// of the window, floored at 0. Always 0 on admission.
    pub reset_ms: u64,
}

/// Sliding-window rate limiter over an injectable window store.
///
/// Evaluates the count of events in the trailing interval
/// `(now - window_ms, now]`, recomputed per request rather than reset at
/// fixed boundaries. Stale timestamps are pruned on every check and the
/// pruned list is persisted even when the request is denied.
pub struct RateLimiter {
    store: Arc<dyn WindowStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Creates a new rate limiter over the given store.
    ///
    /// # Arguments
    /// * `store` - Window store backend
    /// * `config` - Window length and admission limit
    #[must_use]
    pub fn new(store: Arc<dyn WindowStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Returns the limiter configuration.
    #[must_use]
    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Checks and updates the window for `key` using the wall clock.
    pub async fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, now_unix_ms()).await
    }

    /// Checks and updates the window for `key` at an explicit timestamp.
    ///
    /// This is the full admission algorithm; `check` merely supplies `now`.
    /// Taking the timestamp as a parameter keeps the window arithmetic
    /// testable without sleeping.
    ///
    /// # Arguments
    /// * `key` - Composite rate-limit key
    /// * `now_ms` - Current time in unix milliseconds
    pub async fn check_at(&self, key: &str, now_ms: u64) -> RateLimitDecision {
        let window_start = now_ms.saturating_sub(self.config.window_ms);

        let mut timestamps = self.store.get(key).await.unwrap_or_default();
        timestamps.retain(|&ts| ts > window_start);

        if timestamps.len() as u32 >= self.config.limit {
            let oldest = timestamps.first().copied().unwrap_or(now_ms);
            let reset_ms =
                self.config.window_ms.saturating_sub(now_ms.saturating_sub(oldest));

            // Pruning persists on denial too.
            self.store.set(key, timestamps).await;

            warn!(
                key = %key,
                limit = self.config.limit,
                window_ms = self.config.window_ms,
                reset_ms = reset_ms,
                "Rate limit exceeded"
            );
            return RateLimitDecision { allowed: false, remaining: 0, reset_ms };
        }

        timestamps.push(now_ms);
        let remaining = self.config.limit - timestamps.len() as u32;
        self.store.set(key, timestamps).await;

        debug!(
            key = %key,
            remaining = remaining,
            limit = self.config.limit,
            "Rate limit check passed"
        );
        RateLimitDecision { allowed: true, remaining, reset_ms: 0 }
    }
}

/// Current unix time in milliseconds.
#[allow(clippy::cast_possible_truncation)]
fn now_unix_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis() as u64)
}
