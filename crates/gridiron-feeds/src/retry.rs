//! Exponential backoff for transient feed failures.

use std::time::Duration;

use gridiron_core::config::RetryConfig;
use rand::Rng;

/// How many times a page request is attempted and how long to wait between
/// attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Never less than 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    /// Upper bound on a provider-supplied `Retry-After`.
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            initial_backoff: Duration::from_millis(cfg.initial_backoff_ms),
            max_backoff: Duration::from_millis(cfg.max_backoff_ms),
            multiplier: if cfg.multiplier.is_finite() && cfg.multiplier >= 1.0 {
                cfg.multiplier
            } else {
                1.0
            },
            max_retry_after: Duration::from_secs(cfg.max_retry_after_secs),
        }
    }

    /// Policy with no sleeping between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
            max_retry_after: Duration::ZERO,
        }
    }

    /// Backoff before the next attempt, after `failed_attempts` failures
    /// (1-based), without jitter.
    pub fn base_delay(&self, failed_attempts: u32) -> Duration {
        let exp = failed_attempts.saturating_sub(1).min(32) as i32;
        let ms = self.initial_backoff.as_millis() as f64 * self.multiplier.powi(exp);
        let capped = ms.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// [`base_delay`](Self::base_delay) plus up to 10% jitter, or the
    /// provider's `Retry-After` (capped) when it sent one.
    pub fn delay(&self, failed_attempts: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(wait) = retry_after {
            return wait.min(self.max_retry_after);
        }
        let base = self.base_delay(failed_attempts);
        let jitter: f64 = rand::thread_rng().gen_range(0.0..=0.1);
        base + base.mul_f64(jitter)
    }
}
