// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal /proc reading for liveness checks and process discovery.

use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::path::Path;

/// Whether `pid` still exists (signal 0 probe; EPERM counts as alive).
pub fn pid_alive(pid: u32) -> bool {
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// List `(pid, comm)` for every process under `proc_root`.
///
/// Unreadable entries (processes that exited mid-scan, permission walls)
/// are skipped.
pub fn list_processes(proc_root: &Path) -> Vec<(u32, String)> {
    let Ok(entries) = std::fs::read_dir(proc_root) else {
        return Vec::new();
    };
    let mut processes = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(pid) = name.to_str().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };
        let Ok(comm) = std::fs::read_to_string(entry.path().join("comm")) else {
            continue;
        };
        processes.push((pid, comm.trim().to_string()));
    }
    processes
}

#[cfg(test)]
#[path = "proc_tests.rs"]
mod tests;
