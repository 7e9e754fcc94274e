// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run-mode and attach-mode supervision.
//!
//! The supervised process must outlive the supervisor: children are placed
//! in their own process group, never killed on drop, and the only teardown
//! path is the explicit run-mode cancellation used for job cancels.

use crate::cgroup::CgroupScope;
use crate::fallback;
use crate::limits::LimitSet;
use crate::proc::pid_alive;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

/// How a supervision episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReport {
    /// Run mode: the tool exited zero.
    CompletedSuccessfully,
    /// Run mode: the tool exited non-zero (code, if one exists).
    NonZeroExit(Option<i32>),
    /// Attach mode: the process ran to completion under observation.
    ObservedToCompletion,
    /// The wrapper was interrupted; the workload keeps running.
    DetachedWorkloadContinues,
}

recode_core::simple_display! {
    ExitReport {
        CompletedSuccessfully => "completed_successfully",
        NonZeroExit(..) => "non_zero_exit",
        ObservedToCompletion => "observed_to_completion",
        DetachedWorkloadContinues => "detached_workload_continues",
    }
}

#[derive(Debug, Error)]
pub enum GovernError {
    #[error("empty command")]
    EmptyCommand,
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("wait failed: {0}")]
    Wait(#[source] std::io::Error),
    #[error("process {0} not found")]
    NoSuchProcess(u32),
}

/// Run-mode configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Program and arguments.
    pub command: Vec<String>,
    pub limits: LimitSet,
    /// cgroup container name; one scope per supervised process.
    pub scope_name: String,
    pub cgroup_root: PathBuf,
    /// SIGTERM-to-SIGKILL window on explicit teardown.
    pub term_grace: Duration,
}

impl RunConfig {
    pub fn new(command: Vec<String>, limits: LimitSet, scope_name: impl Into<String>) -> Self {
        Self {
            command,
            limits,
            scope_name: scope_name.into(),
            cgroup_root: PathBuf::from("/sys/fs/cgroup"),
            term_grace: Duration::from_secs(30),
        }
    }
}

/// A spawned, governed child process.
pub struct GovernedChild {
    child: Child,
    pid: u32,
    scope: Option<CgroupScope>,
}

impl GovernedChild {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Wait for the tool to exit on its own.
    pub async fn wait(&mut self) -> Result<ExitReport, GovernError> {
        let status = self.child.wait().await.map_err(GovernError::Wait)?;
        self.cleanup_scope();
        Ok(report_for(status))
    }

    /// Explicit teardown (job cancel): SIGTERM the process group, give it
    /// the grace window, then SIGKILL. Children of the tool die with it.
    pub async fn terminate(&mut self, grace: Duration) -> Result<ExitReport, GovernError> {
        let pgid = Pid::from_raw(self.pid as i32);
        if let Err(e) = killpg(pgid, Signal::SIGTERM) {
            tracing::warn!(pid = self.pid, error = %e, "SIGTERM failed");
        }
        let status = match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => status.map_err(GovernError::Wait)?,
            Err(_) => {
                tracing::warn!(pid = self.pid, "grace expired, sending SIGKILL");
                if let Err(e) = killpg(pgid, Signal::SIGKILL) {
                    tracing::warn!(pid = self.pid, error = %e, "SIGKILL failed");
                }
                self.child.wait().await.map_err(GovernError::Wait)?
            }
        };
        self.cleanup_scope();
        Ok(report_for(status))
    }

    fn cleanup_scope(&self) {
        if let Some(scope) = &self.scope {
            scope.cleanup();
        }
    }
}

fn report_for(status: ExitStatus) -> ExitReport {
    if status.success() {
        ExitReport::CompletedSuccessfully
    } else {
        ExitReport::NonZeroExit(status.code())
    }
}

/// Spawn the tool into a fresh limit container.
///
/// The child gets its own process group and is never killed on drop, so a
/// wrapper crash leaves the workload running. Limit application is
/// best-effort: cgroups first, renice/ionice/oom-score fallback when no
/// hierarchy is writable.
pub async fn spawn_governed(config: &RunConfig) -> Result<GovernedChild, GovernError> {
    let (program, args) = config.command.split_first().ok_or(GovernError::EmptyCommand)?;

    let mut command = Command::new(program);
    command.args(args).process_group(0).kill_on_drop(false);
    let child = command.spawn().map_err(|source| GovernError::Spawn {
        command: program.clone(),
        source,
    })?;
    let pid = child.id().unwrap_or_default();
    tracing::info!(pid, command = %program, scope = %config.scope_name, "tool spawned");

    let scope = govern_pid(pid, &config.limits, &config.cgroup_root, &config.scope_name).await;
    Ok(GovernedChild { child, pid, scope })
}

/// Run mode end to end: spawn, observe, and on `teardown` terminate the
/// process group within the grace window.
pub async fn run_governed(
    config: &RunConfig,
    teardown: CancellationToken,
) -> Result<ExitReport, GovernError> {
    let mut child = spawn_governed(config).await?;
    tokio::select! {
        report = child.wait() => return report,
        _ = teardown.cancelled() => {}
    }
    child.terminate(config.term_grace).await
}

/// Attach mode: move an existing process into a fresh limit container and
/// observe it. Nothing is spawned, nothing is ever killed.
pub async fn attach_governed(
    pid: u32,
    limits: &LimitSet,
    cgroup_root: &std::path::Path,
    scope_name: &str,
    interrupted: CancellationToken,
) -> Result<ExitReport, GovernError> {
    if !pid_alive(pid) {
        return Err(GovernError::NoSuchProcess(pid));
    }
    let scope = govern_pid(pid, limits, cgroup_root, scope_name).await;

    let report = loop {
        if !pid_alive(pid) {
            break ExitReport::ObservedToCompletion;
        }
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            _ = interrupted.cancelled() => break ExitReport::DetachedWorkloadContinues,
        }
    };
    if report == ExitReport::ObservedToCompletion {
        if let Some(scope) = scope {
            scope.cleanup();
        }
    }
    tracing::info!(pid, %report, "attach observation finished");
    Ok(report)
}

/// Shared limit application: cgroup scope when a hierarchy is usable,
/// renice/ionice/oom-score otherwise. Never fails.
async fn govern_pid(
    pid: u32,
    limits: &LimitSet,
    cgroup_root: &std::path::Path,
    scope_name: &str,
) -> Option<CgroupScope> {
    match CgroupScope::detect(cgroup_root) {
        Some(version) => match CgroupScope::create(cgroup_root, version, scope_name) {
            Ok(scope) => {
                let applied = scope.apply(limits);
                match scope.attach(pid) {
                    Ok(()) => {
                        tracing::info!(pid, applied, version = %version, "cgroup governance active");
                        return Some(scope);
                    }
                    Err(e) => {
                        tracing::warn!(pid, error = %e, "cgroup attach failed, using fallback");
                        scope.cleanup();
                    }
                }
            }
            Err(e) => {
                tracing::warn!(pid, error = %e, "cgroup scope creation failed, using fallback");
            }
        },
        None => {
            tracing::warn!(pid, "no cgroup hierarchy, using fallback");
        }
    }

    let applied = fallback::apply(pid, limits).await;
    tracing::info!(pid, applied, "fallback governance active");
    None
}

#[cfg(test)]
#[path = "supervise_tests.rs"]
mod tests;
