// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Retry policy with linear backoff for remote uploads.
//
// Attempts are numbered from 1. After a failed attempt `n` the caller sleeps
// `2 * n` backoff units, but only when another attempt follows.

use std::time::Duration;

use postwerk_core::config::UploadConfig;
use tracing::{debug, warn};

/// Retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Length of one backoff unit.
    pub backoff_unit: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl From<&UploadConfig> for RetryConfig {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_unit: Duration::from_millis(config.backoff_unit_ms),
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after this delay.
    RetryAfter(Duration),
    /// Maximum attempts exhausted.
    Exhausted,
}

/// Decide whether to retry after failed attempt `attempt` (1-based).
pub fn after_failure(attempt: u32, config: &RetryConfig) -> RetryDecision {
    if attempt >= config.max_attempts {
        warn!(attempt, max = config.max_attempts, "retry limit exhausted");
        return RetryDecision::Exhausted;
    }
    let delay = backoff_delay(attempt, config);
    debug!(attempt, delay_ms = delay.as_millis() as u64, "scheduling retry");
    RetryDecision::RetryAfter(delay)
}

/// Pause following failed attempt `attempt`: `2 * attempt` units.
pub fn backoff_delay(attempt: u32, config: &RetryConfig) -> Duration {
    config.backoff_unit.saturating_mul(attempt.saturating_mul(2))
}
