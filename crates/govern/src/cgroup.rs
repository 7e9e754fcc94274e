// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! cgroup limit containers.
//!
//! v2 is preferred (unified hierarchy, `cgroup.procs`, `cpu.max`); v1 is
//! supported through the per-controller hierarchies. Every write is
//! best-effort: a missing controller or a permission failure downgrades to
//! a warning and the remaining limits still apply. The filesystem root is
//! injectable so tests run against a scratch directory.

use crate::limits::LimitSet;
use std::io;
use std::path::{Path, PathBuf};

/// Period used for v2 `cpu.max` and v1 `cpu.cfs_period_us`, in microseconds.
const CPU_PERIOD_US: u64 = 100_000;

/// Which cgroup layout the host mounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgroupVersion {
    V2,
    V1,
}

recode_core::simple_display! {
    CgroupVersion {
        V2 => "v2",
        V1 => "v1",
    }
}

/// A limit container created (or adopted) under the cgroup filesystem.
#[derive(Debug, Clone)]
pub struct CgroupScope {
    root: PathBuf,
    version: CgroupVersion,
    name: String,
}

impl CgroupScope {
    /// Detect the mounted cgroup version under `root` (normally
    /// `/sys/fs/cgroup`). `None` means no usable hierarchy.
    pub fn detect(root: &Path) -> Option<CgroupVersion> {
        if root.join("cgroup.controllers").is_file() {
            return Some(CgroupVersion::V2);
        }
        if root.join("cpu").is_dir() || root.join("memory").is_dir() {
            return Some(CgroupVersion::V1);
        }
        None
    }

    /// Create a fresh container named `name`. Fails only when the directory
    /// itself cannot be created; individual limit writes never fail the
    /// scope.
    pub fn create(root: impl Into<PathBuf>, version: CgroupVersion, name: &str) -> io::Result<Self> {
        let scope = Self { root: root.into(), version, name: name.to_string() };
        for dir in scope.controller_dirs() {
            std::fs::create_dir_all(&dir)?;
        }
        tracing::debug!(name, version = %version, "created cgroup scope");
        Ok(scope)
    }

    pub fn version(&self) -> CgroupVersion {
        self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn controller_dirs(&self) -> Vec<PathBuf> {
        match self.version {
            CgroupVersion::V2 => vec![self.root.join(&self.name)],
            CgroupVersion::V1 => vec![
                self.root.join("cpu").join(&self.name),
                self.root.join("memory").join(&self.name),
                self.root.join("blkio").join(&self.name),
            ],
        }
    }

    /// Apply every limit in the set, independently. Returns how many limits
    /// actually landed.
    pub fn apply(&self, limits: &LimitSet) -> usize {
        let mut applied = 0;
        match self.version {
            CgroupVersion::V2 => {
                let dir = self.root.join(&self.name);
                if let Some(pct) = limits.cpu_percent {
                    let quota = (CPU_PERIOD_US * pct as u64) / 100;
                    applied += self.write(&dir.join("cpu.max"), &format!("{} {}", quota, CPU_PERIOD_US));
                }
                if let Some(weight) = limits.cpu_weight {
                    applied += self.write(&dir.join("cpu.weight"), &weight.to_string());
                }
                if let Some(mb) = limits.memory_mb {
                    applied += self.write(&dir.join("memory.max"), &(mb * 1024 * 1024).to_string());
                }
                if let Some(weight) = limits.io_weight {
                    applied += self.write(&dir.join("io.weight"), &weight.to_string());
                }
            }
            CgroupVersion::V1 => {
                if let Some(pct) = limits.cpu_percent {
                    let dir = self.root.join("cpu").join(&self.name);
                    let quota = (CPU_PERIOD_US * pct as u64) / 100;
                    applied += self.write(&dir.join("cpu.cfs_period_us"), &CPU_PERIOD_US.to_string());
                    applied += self.write(&dir.join("cpu.cfs_quota_us"), &quota.to_string());
                    applied = applied.saturating_sub(1); // count the pair once
                }
                if let Some(shares) = limits.cpu_weight {
                    let dir = self.root.join("cpu").join(&self.name);
                    // v1 shares are ~1024-centered; weight is 100-centered.
                    applied += self.write(&dir.join("cpu.shares"), &(shares * 10).to_string());
                }
                if let Some(mb) = limits.memory_mb {
                    let dir = self.root.join("memory").join(&self.name);
                    applied +=
                        self.write(&dir.join("memory.limit_in_bytes"), &(mb * 1024 * 1024).to_string());
                }
                if let Some(weight) = limits.io_weight {
                    let dir = self.root.join("blkio").join(&self.name);
                    applied += self.write(&dir.join("blkio.weight"), &weight.to_string());
                }
            }
        }
        applied
    }

    /// Move a process into the container. Membership is what actually
    /// enforces the limits, so a failure here is reported (the caller falls
    /// back to renice/ionice) rather than swallowed.
    pub fn attach(&self, pid: u32) -> io::Result<()> {
        let procs_files: Vec<PathBuf> = match self.version {
            CgroupVersion::V2 => vec![self.root.join(&self.name).join("cgroup.procs")],
            CgroupVersion::V1 => {
                self.controller_dirs().into_iter().map(|d| d.join("cgroup.procs")).collect()
            }
        };
        for file in procs_files {
            std::fs::write(&file, pid.to_string())?;
        }
        tracing::info!(pid, scope = %self.name, version = %self.version, "process attached to cgroup");
        Ok(())
    }

    /// Remove the (empty) container directories. Best-effort; a scope with
    /// live members simply stays behind.
    pub fn cleanup(&self) {
        for dir in self.controller_dirs() {
            if let Err(e) = std::fs::remove_dir(&dir) {
                tracing::debug!(dir = %dir.display(), error = %e, "cgroup cleanup skipped");
            }
        }
    }

    fn write(&self, path: &Path, value: &str) -> usize {
        match std::fs::write(path, value) {
            Ok(()) => {
                tracing::debug!(file = %path.display(), value, "cgroup limit applied");
                1
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), value, error = %e, "cgroup limit not applied");
                0
            }
        }
    }
}

#[cfg(test)]
#[path = "cgroup_tests.rs"]
mod tests;
