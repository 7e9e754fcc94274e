// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Degraded limit enforcement for hosts without usable cgroups.
//!
//! renice and ionice are invoked as external commands; the OOM score is a
//! direct /proc write. Everything here is best-effort and warning-only,
//! matching the wrapper's never-fatal contract.

use crate::limits::LimitSet;
use std::path::Path;
use tokio::process::Command;

/// Apply the fallback subset (nice, io class, oom score) to `pid`.
/// Returns how many adjustments landed.
pub async fn apply(pid: u32, limits: &LimitSet) -> usize {
    let mut applied = 0;

    if let Some(nice) = limits.nice {
        if run_tool("renice", &["-n", &nice.to_string(), "-p", &pid.to_string()]).await {
            applied += 1;
        }
    }

    // Map an IO weight onto best-effort class levels 0..=7 (lower weight,
    // lower priority).
    if let Some(weight) = limits.io_weight {
        let level = (7u32.saturating_sub(weight * 7 / 10_000)).min(7);
        if run_tool(
            "ionice",
            &["-c", "2", "-n", &level.to_string(), "-p", &pid.to_string()],
        )
        .await
        {
            applied += 1;
        }
    }

    if let Some(adj) = limits.oom_score_adj {
        if write_oom_score_adj(Path::new("/proc"), pid, adj) {
            applied += 1;
        }
    }

    applied
}

async fn run_tool(tool: &str, args: &[&str]) -> bool {
    match Command::new(tool).args(args).output().await {
        Ok(output) if output.status.success() => {
            tracing::debug!(tool, ?args, "fallback limit applied");
            true
        }
        Ok(output) => {
            tracing::warn!(
                tool,
                ?args,
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "fallback limit not applied"
            );
            false
        }
        Err(e) => {
            tracing::warn!(tool, ?args, error = %e, "fallback tool unavailable");
            false
        }
    }
}

pub(crate) fn write_oom_score_adj(proc_root: &Path, pid: u32, adj: i32) -> bool {
    let path = proc_root.join(pid.to_string()).join("oom_score_adj");
    match std::fs::write(&path, adj.to_string()) {
        Ok(()) => {
            tracing::debug!(pid, adj, "oom_score_adj applied");
            true
        }
        Err(e) => {
            tracing::warn!(pid, adj, error = %e, "oom_score_adj not applied");
            false
        }
    }
}

#[cfg(test)]
#[path = "fallback_tests.rs"]
mod tests;
