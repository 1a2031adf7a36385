//! Sign-in attempt limiter
//!
//! Counts consecutive failed sign-ins on this client and locks further
//! attempts once the limit is reached. The lock is purely local: it holds
//! until the counter is reset by a successful sign-in or by the caller.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Consecutive failures allowed before attempts are blocked
    pub max_attempts: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

/// Rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Rate limiter configuration
    config: RateLimiterConfig,
    /// Consecutive failures so far
    failures: Arc<Mutex<u32>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            failures: Arc::new(Mutex::new(0)),
        }
    }

    /// Check if another attempt may be made
    pub async fn is_allowed(&self) -> bool {
        *self.failures.lock().await < self.config.max_attempts
    }

    /// Record a failed attempt, returning the consecutive failure count
    pub async fn record_failure(&self) -> u32 {
        let mut failures = self.failures.lock().await;
        *failures = failures.saturating_add(1);

        if *failures >= self.config.max_attempts {
            warn!(
                "Sign-in blocked after {} consecutive failures",
                *failures
            );
        }
        *failures
    }

    /// Forget previous failures
    pub async fn reset(&self) {
        let mut failures = self.failures.lock().await;
        if *failures > 0 {
            info!("Resetting sign-in attempt counter");
        }
        *failures = 0;
    }

    /// Attempts left before the lock engages
    pub async fn remaining(&self) -> u32 {
        self.config
            .max_attempts
            .saturating_sub(*self.failures.lock().await)
    }

    /// Get the rate limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blocks_after_max_failures() {
        let limiter = RateLimiter::new(RateLimiterConfig::default());

        for expected in 1..=4 {
            assert!(limiter.is_allowed().await);
            assert_eq!(limiter.record_failure().await, expected);
        }
        assert!(limiter.is_allowed().await);
        assert_eq!(limiter.remaining().await, 1);

        limiter.record_failure().await;
        assert!(!limiter.is_allowed().await);
        assert_eq!(limiter.remaining().await, 0);
    }

    #[tokio::test]
    async fn test_reset_unblocks() {
        let limiter = RateLimiter::new(RateLimiterConfig { max_attempts: 2 });
        limiter.record_failure().await;
        limiter.record_failure().await;
        assert!(!limiter.is_allowed().await);

        limiter.reset().await;
        assert!(limiter.is_allowed().await);
        assert_eq!(limiter.remaining().await, limiter.config().max_attempts);
    }
}
