// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry policy: exponential backoff and transient-error classification.
//!
//! The same policy drives two very different callers: the master's retry
//! engine (scheduling `next_attempt_at` for failed jobs) and the worker's
//! HTTP client (re-sending heartbeats and result uploads). The transient
//! allowlist is data, not code; operators extend it through configuration.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Substrings that mark an error message as transient. Matching is
/// case-insensitive.
pub const DEFAULT_TRANSIENT_ERRORS: &[&str] = &[
    "connection refused",
    "connection reset",
    "timeout",
    "timed out",
    "network error",
    "worker died",
    "stale",
    "temporarily unavailable",
];

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureClass {
    Transient,
    Permanent,
}

crate::simple_display! {
    FailureClass {
        Transient => "transient",
        Permanent => "permanent",
    }
}

/// Case-insensitive substring matcher over the transient allowlist.
#[derive(Debug, Clone)]
pub struct TransientMatcher {
    needles: Vec<String>,
}

impl Default for TransientMatcher {
    fn default() -> Self {
        Self {
            needles: DEFAULT_TRANSIENT_ERRORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TransientMatcher {
    /// Default list plus operator-supplied extras.
    pub fn with_extras<I, S>(extras: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut matcher = Self::default();
        for extra in extras {
            let needle = extra.as_ref().trim().to_lowercase();
            if !needle.is_empty() && !matcher.needles.contains(&needle) {
                matcher.needles.push(needle);
            }
        }
        matcher
    }

    pub fn is_transient(&self, error: &str) -> bool {
        let haystack = error.to_lowercase();
        self.needles.iter().any(|n| haystack.contains(n))
    }

    pub fn classify(&self, error: &str) -> FailureClass {
        if self.is_transient(error) {
            FailureClass::Transient
        } else {
            FailureClass::Permanent
        }
    }
}

/// Exponential backoff: `base · 2^attempt`, capped, with ±20% jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Deterministic delay before jitter. `attempt` counts completed
    /// attempts, so the first retry waits the base delay.
    pub fn raw_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.min(32));
        let delay_ms = (self.base_delay.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(delay_ms).min(self.max_delay)
    }

    /// Jittered delay actually scheduled. Stays within ±20% of
    /// [`Self::raw_delay`].
    pub fn delay(&self, attempt: u32) -> Duration {
        let raw = self.raw_delay(attempt).as_millis() as u64;
        let spread = raw / 5;
        if spread == 0 {
            return Duration::from_millis(raw);
        }
        let jitter = rand::thread_rng().gen_range(0..=spread * 2);
        Duration::from_millis(raw - spread + jitter)
    }

    /// Whether another attempt is allowed after `attempt` completed ones.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
