//! Shared limiter for outbound judgment and random-source calls.
//!
//! Two `governor` limiters are awaited in turn: one enforcing a minimum
//! spacing between consecutive calls, one capping calls per window. Waiting
//! is cooperative (`until_ready`), never a busy loop.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::time::Duration;

use crate::domain::models::RateLimitConfig;
use crate::infrastructure::config::ConfigError;

type DirectLimiter = Governor<NotKeyed, InMemoryState, DefaultClock>;

pub struct RateLimiter {
    spacing: Option<DirectLimiter>,
    window: DirectLimiter,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Result<Self, ConfigError> {
        let per_window = NonZeroU32::new(config.requests_per_window).ok_or(ConfigError::OutOfRange {
            field: "rate_limit.requests_per_window",
            value: "0".to_string(),
            range: "[1, ...)",
        })?;
        if config.window_secs == 0 {
            return Err(ConfigError::OutOfRange {
                field: "rate_limit.window_secs",
                value: "0".to_string(),
                range: "[1, ...)",
            });
        }

        // Replenish one cell every window/n, allowing the full window as a burst.
        let window = Duration::from_secs(config.window_secs);
        let replenish = window / per_window.get();
        let window_quota = Quota::with_period(replenish)
            .ok_or_else(|| ConfigError::ValidationFailed("rate limit window too small".to_string()))?
            .allow_burst(per_window);

        let spacing = Quota::with_period(Duration::from_millis(config.min_interval_ms))
            .map(|quota| Governor::direct(quota.allow_burst(NonZeroU32::MIN)));

        Ok(Self {
            spacing,
            window: Governor::direct(window_quota),
        })
    }

    /// Wait until both limiters admit one call.
    pub async fn acquire(&self) {
        if let Some(spacing) = &self.spacing {
            spacing.until_ready().await;
        }
        self.window.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn config(min_interval_ms: u64, requests_per_window: u32, window_secs: u64) -> RateLimitConfig {
        RateLimitConfig {
            min_interval_ms,
            requests_per_window,
            window_secs,
        }
    }

    #[tokio::test]
    async fn test_first_call_is_immediate() {
        let limiter = RateLimiter::new(&config(100, 10, 60)).unwrap();
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_min_interval_spaces_calls() {
        let limiter = RateLimiter::new(&config(150, 100, 60)).unwrap();
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(250), "got {:?}", start.elapsed());
    }

    #[tokio::test]
    async fn test_zero_interval_disables_spacing() {
        let limiter = RateLimiter::new(&config(0, 50, 1)).unwrap();
        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_window_caps_burst() {
        // 2 per second: the third call waits for a replenished cell (~500ms).
        let limiter = RateLimiter::new(&config(0, 2, 1)).unwrap();
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(400), "got {:?}", start.elapsed());
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(RateLimiter::new(&config(0, 0, 60)).is_err());
        assert!(RateLimiter::new(&config(0, 5, 0)).is_err());
    }
}
