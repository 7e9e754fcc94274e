// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The limit set the wrapper tries to apply.

use recode_core::job::ResourceLimits;
use serde::{Deserialize, Serialize};

/// Everything the wrapper knows how to enforce. Each field is applied
/// independently; a `None` is simply skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitSet {
    /// CPU quota as a percentage of one core (200 = two cores).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<u32>,
    /// cgroup cpu.weight (1..=10000).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_weight: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<u64>,
    /// cgroup io.weight (1..=10000).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub io_weight: Option<u32>,
    /// Nice value for the fallback path (-20..=19).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nice: Option<i32>,
    /// /proc/<pid>/oom_score_adj (-1000..=1000).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oom_score_adj: Option<i32>,
}

impl LimitSet {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Conservative defaults for auto-discovered processes nobody sized.
    pub fn discovery_default() -> Self {
        Self {
            cpu_percent: Some(50),
            cpu_weight: Some(100),
            memory_mb: Some(2048),
            io_weight: None,
            nice: Some(10),
            oom_score_adj: Some(200),
        }
    }
}

impl From<&ResourceLimits> for LimitSet {
    fn from(limits: &ResourceLimits) -> Self {
        Self {
            cpu_percent: limits.max_cpu_percent,
            cpu_weight: None,
            memory_mb: limits.max_memory_mb,
            io_weight: None,
            nice: None,
            oom_score_adj: None,
        }
    }
}

#[cfg(test)]
#[path = "limits_tests.rs"]
mod tests;
