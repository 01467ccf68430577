//! Retry policy for transient backend failures

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Bounded exponential backoff
///
/// `max_attempts` counts the first try, so `3` means one call plus at most
/// two retries. Only errors accepted by [`RetryPolicy::should_retry`] are
/// retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Upper bound on any single delay
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Growth factor between consecutive delays
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_attempts() -> u32 { 3 }
fn default_base_delay() -> u64 { 200 }
fn default_max_delay() -> u64 { 2_000 }
fn default_multiplier() -> f64 { 2.0 }

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// Policy that retries without sleeping
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
            multiplier: 1.0,
        }
    }

    /// Policy that never retries
    pub fn none() -> Self {
        Self::immediate(1)
    }

    /// Set max attempts
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let raw = self.base_delay_ms as f64 * self.multiplier.max(1.0).powi(exponent);
        let capped = raw.min(self.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }

    /// Whether `err`, raised on `attempt` (1-based), should be retried
    pub fn should_retry(&self, err: &BridgeError, attempt: u32) -> bool {
        attempt < self.max_attempts.max(1) && err.is_retryable()
    }
}
