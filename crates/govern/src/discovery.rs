// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auto-discovery daemon.
//!
//! Scans the process table for configured command names and attaches any
//! newly appearing pid with the default limit set. Failed attaches land in
//! a retry queue with exponential backoff; items that exhaust their
//! attempts are dropped with a log line.

use crate::limits::LimitSet;
use crate::proc::{list_processes, pid_alive};
use crate::supervise::attach_governed;
use recode_core::clock::{Clock, SystemClock};
use recode_core::retry::RetryPolicy;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Command names (comm values) to govern, e.g. `ffmpeg`.
    pub targets: Vec<String>,
    pub limits: LimitSet,
    pub scan_interval: Duration,
    pub proc_root: PathBuf,
    pub cgroup_root: PathBuf,
    pub retry: RetryPolicy,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            targets: vec!["ffmpeg".to_string(), "gst-launch-1.0".to_string()],
            limits: LimitSet::discovery_default(),
            scan_interval: Duration::from_secs(10),
            proc_root: PathBuf::from("/proc"),
            cgroup_root: PathBuf::from("/sys/fs/cgroup"),
            retry: RetryPolicy { max_retries: 5, ..RetryPolicy::default() },
        }
    }
}

#[derive(Debug, Clone)]
struct PendingAttach {
    pid: u32,
    comm: String,
    attempts: u32,
    next_attempt_at_ms: u64,
}

/// The scan loop state. Drive it with [`DiscoveryDaemon::run`], or call
/// [`DiscoveryDaemon::tick`] directly in tests.
pub struct DiscoveryDaemon<C: Clock = SystemClock> {
    config: DiscoveryConfig,
    clock: C,
    governed: HashSet<u32>,
    pending: HashMap<u32, PendingAttach>,
    shutdown: CancellationToken,
}

impl<C: Clock> DiscoveryDaemon<C> {
    pub fn new(config: DiscoveryConfig, clock: C, shutdown: CancellationToken) -> Self {
        Self { config, clock, governed: HashSet::new(), pending: HashMap::new(), shutdown }
    }

    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.config.scan_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("discovery daemon stopping");
                    return;
                }
            }
            self.tick().await;
        }
    }

    /// One scan-and-attach pass.
    pub async fn tick(&mut self) {
        let now = self.clock.epoch_ms();

        // Forget processes that are gone so their pids can be reused.
        self.governed.retain(|pid| pid_alive(*pid));
        self.pending.retain(|pid, _| pid_alive(*pid));

        for (pid, comm) in list_processes(&self.config.proc_root) {
            if !self.config.targets.iter().any(|t| t == &comm) {
                continue;
            }
            if self.governed.contains(&pid) || self.pending.contains_key(&pid) {
                continue;
            }
            tracing::info!(pid, comm = %comm, "discovered ungoverned target");
            self.pending.insert(
                pid,
                PendingAttach { pid, comm, attempts: 0, next_attempt_at_ms: now },
            );
        }

        let due: Vec<PendingAttach> = self
            .pending
            .values()
            .filter(|p| p.next_attempt_at_ms <= now)
            .cloned()
            .collect();
        for mut item in due {
            let scope_name = format!("recode-auto-{}", item.pid);
            // Observation is not the daemon's job; a pre-cancelled token
            // makes the attach apply limits and detach immediately.
            let detach_now = CancellationToken::new();
            detach_now.cancel();
            let result = attach_governed(
                item.pid,
                &self.config.limits,
                &self.config.cgroup_root,
                &scope_name,
                detach_now,
            )
            .await;

            match result {
                Ok(_) => {
                    self.pending.remove(&item.pid);
                    self.governed.insert(item.pid);
                }
                Err(e) => {
                    item.attempts += 1;
                    if self.config.retry.allows_retry(item.attempts) {
                        let delay = self.config.retry.delay(item.attempts);
                        item.next_attempt_at_ms = now + delay.as_millis() as u64;
                        tracing::warn!(
                            pid = item.pid,
                            comm = %item.comm,
                            attempts = item.attempts,
                            retry_in_ms = delay.as_millis() as u64,
                            error = %e,
                            "attach failed, queued for retry"
                        );
                        self.pending.insert(item.pid, item);
                    } else {
                        tracing::warn!(
                            pid = item.pid,
                            comm = %item.comm,
                            attempts = item.attempts,
                            error = %e,
                            "attach abandoned after max attempts"
                        );
                        self.pending.remove(&item.pid);
                    }
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn governed(&self) -> &HashSet<u32> {
        &self.governed
    }

    #[cfg(test)]
    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
