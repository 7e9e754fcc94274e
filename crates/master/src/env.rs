// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the master binary.

use recode_core::retry::{RetryPolicy, TransientMatcher};
use recode_store::DbKind;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{name} is invalid: {message}")]
    Invalid { name: &'static str, message: String },
}

/// Master configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct MasterConfig {
    pub listen_addr: String,
    /// Bearer secret every caller must present.
    pub api_key: String,
    pub db_kind: DbKind,
    pub db_dsn: String,
    pub scheduler_interval: Duration,
    pub reconcile_interval: Duration,
    /// Interval workers are told to heartbeat at.
    pub heartbeat_interval: Duration,
    /// Missed intervals before a worker is declared dead.
    pub worker_failure_threshold: u32,
    /// Jobs considered per scheduler tick.
    pub schedule_batch: i64,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// Extra transient-error substrings from the operator.
    pub transient_errors: Vec<String>,
    pub retention_age: Duration,
    pub retention_batch: i64,
    pub retention_interval: Duration,
}

fn var(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Accepts bare milliseconds ("2500") or a suffixed duration ("30s", "5m").
fn duration_ms(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(raw) => match raw.parse::<u64>() {
            Ok(ms) => Ok(Duration::from_millis(ms)),
            Err(_) => recode_core::parse_duration(&raw)
                .map_err(|message| ConfigError::Invalid { name, message }),
        },
    }
}

fn number<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::Invalid {
            name,
            message: format!("{:?} is not a number", raw),
        }),
    }
}

impl MasterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = var("MASTER_API_KEY").ok_or(ConfigError::Missing("MASTER_API_KEY"))?;
        let db_kind = var("DATABASE_TYPE")
            .unwrap_or_else(|| "sqlite".to_string())
            .parse::<DbKind>()
            .map_err(|e| ConfigError::Invalid { name: "DATABASE_TYPE", message: e.to_string() })?;
        let db_dsn = var("DATABASE_DSN").unwrap_or_else(|| "sqlite:recode.db?mode=rwc".to_string());

        Ok(Self {
            listen_addr: var("RECODE_LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:8443".to_string()),
            api_key,
            db_kind,
            db_dsn,
            scheduler_interval: duration_ms("RECODE_SCHEDULER_INTERVAL_MS", Duration::from_secs(2))?,
            reconcile_interval: duration_ms("RECODE_RECONCILE_INTERVAL_MS", Duration::from_secs(5))?,
            heartbeat_interval: duration_ms("RECODE_HEARTBEAT_INTERVAL_MS", Duration::from_secs(10))?,
            worker_failure_threshold: number("RECODE_WORKER_FAILURE_THRESHOLD", 3)?,
            schedule_batch: number("RECODE_SCHEDULE_BATCH", 100)?,
            max_retries: number("RECODE_MAX_RETRIES", 3)?,
            retry_base_delay: duration_ms("RECODE_RETRY_BASE_DELAY_MS", Duration::from_secs(5))?,
            retry_max_delay: duration_ms("RECODE_RETRY_MAX_DELAY_MS", Duration::from_secs(300))?,
            transient_errors: var("RECODE_TRANSIENT_ERRORS")
                .map(|raw| raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                .unwrap_or_default(),
            retention_age: duration_ms(
                "RECODE_RETENTION_AGE_MS",
                Duration::from_secs(7 * 24 * 3600),
            )?,
            retention_batch: number("RECODE_RETENTION_BATCH", 500)?,
            retention_interval: duration_ms("RECODE_RETENTION_INTERVAL_MS", Duration::from_secs(60))?,
        })
    }

    /// The retry policy the engine and sweeps share.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: self.retry_base_delay,
            max_delay: self.retry_max_delay,
        }
    }

    pub fn transient_matcher(&self) -> TransientMatcher {
        TransientMatcher::with_extras(&self.transient_errors)
    }

    /// Silence window after which a worker is declared dead.
    pub fn worker_failure_window(&self) -> Duration {
        self.heartbeat_interval * self.worker_failure_threshold.max(1)
    }

    /// Log the resolved configuration with the key redacted.
    pub fn log_startup(&self) {
        tracing::info!(
            listen_addr = %self.listen_addr,
            db = %self.db_kind,
            scheduler_interval_ms = self.scheduler_interval.as_millis() as u64,
            reconcile_interval_ms = self.reconcile_interval.as_millis() as u64,
            heartbeat_interval_ms = self.heartbeat_interval.as_millis() as u64,
            worker_failure_threshold = self.worker_failure_threshold,
            max_retries = self.max_retries,
            retention_age_s = self.retention_age.as_secs(),
            "master configuration loaded"
        );
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
