// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the worker binary.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{name} is invalid: {message}")]
    Invalid { name: &'static str, message: String },
}

/// Worker configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Master base URL, e.g. `https://master.internal:8443`.
    pub master_url: String,
    /// Bearer key for every master call.
    pub api_key: String,
    /// Tenant this worker serves (`default` joins the shared pool).
    pub tenant: String,
    /// Semaphore capacity for concurrent executions.
    pub max_concurrent_jobs: usize,
    pub heartbeat_interval: Duration,
    pub poll_interval: Duration,
    /// Bounded drain window after SIGTERM.
    pub shutdown_timeout: Duration,
    /// Keep temporary inputs after a job ends.
    pub persist_inputs: bool,
    /// Keep final outputs after a job ends (on by default).
    pub persist_outputs: bool,
    /// Permit registering on the same host as the master.
    pub allow_master_as_worker: bool,
    /// Scratch space for job inputs/outputs.
    pub work_dir: PathBuf,
    /// Address advertised to the master.
    pub advertise_addr: String,
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

fn flag(name: &'static str, default: bool) -> bool {
    match var(name).as_deref() {
        Some("1") | Some("true") | Some("yes") => true,
        Some("0") | Some("false") | Some("no") => false,
        _ => default,
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let master_url = var("RECODE_MASTER_URL").ok_or(ConfigError::Missing("RECODE_MASTER_URL"))?;
        let api_key = var("MASTER_API_KEY").ok_or(ConfigError::Missing("MASTER_API_KEY"))?;

        let max_concurrent_jobs = match var("RECODE_MAX_CONCURRENT_JOBS") {
            None => 2,
            Some(raw) => raw.parse::<usize>().ok().filter(|n| *n >= 1).ok_or(
                ConfigError::Invalid {
                    name: "RECODE_MAX_CONCURRENT_JOBS",
                    message: format!("{:?} is not a positive number", raw),
                },
            )?,
        };

        Ok(Self {
            master_url: master_url.trim_end_matches('/').to_string(),
            api_key,
            tenant: var("RECODE_TENANT").unwrap_or_else(|| "default".to_string()),
            max_concurrent_jobs,
            heartbeat_interval: duration_ms(
                "RECODE_HEARTBEAT_INTERVAL_MS",
                Duration::from_secs(10),
            )?,
            poll_interval: duration_ms("RECODE_POLL_INTERVAL_MS", Duration::from_secs(2))?,
            shutdown_timeout: duration_ms(
                "RECODE_SHUTDOWN_TIMEOUT_MS",
                Duration::from_secs(120),
            )?,
            persist_inputs: flag("RECODE_PERSIST_INPUTS", false),
            persist_outputs: flag("RECODE_PERSIST_OUTPUTS", true),
            allow_master_as_worker: flag("RECODE_ALLOW_MASTER_AS_WORKER", false),
            work_dir: var("RECODE_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/var/tmp/recode-worker")),
            advertise_addr: var("RECODE_ADVERTISE_ADDR")
                .unwrap_or_else(|| format!("{}:0", hostname())),
        })
    }

    /// Log the resolved configuration with the key redacted.
    pub fn log_startup(&self) {
        tracing::info!(
            master_url = %self.master_url,
            tenant = %self.tenant,
            max_concurrent_jobs = self.max_concurrent_jobs,
            heartbeat_interval_ms = self.heartbeat_interval.as_millis() as u64,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            persist_inputs = self.persist_inputs,
            persist_outputs = self.persist_outputs,
            work_dir = %self.work_dir.display(),
            "worker configuration loaded"
        );
    }
}

pub(crate) fn hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
