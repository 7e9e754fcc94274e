// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker node record.
//!
//! A worker is a registered executor process somewhere on the network. The
//! master only ever learns about it through registration and heartbeats;
//! the reconciler declares it offline when the heartbeats stop.

use crate::job::JobId;
use crate::tenant::TenantId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// Unique identifier for a worker node.
    pub struct WorkerId("wrk-");
}

/// Dispatch availability of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    /// Registered, heartbeating, no job bound
    Available,
    /// Exactly one non-terminal job bound
    Busy,
    /// Heartbeats stopped; jobs referencing it are orphans
    Offline,
    /// Deregistering; finishes its current job, receives no new ones
    Draining,
}

impl WorkerStatus {
    pub const ALL: [WorkerStatus; 4] = [
        WorkerStatus::Available,
        WorkerStatus::Busy,
        WorkerStatus::Offline,
        WorkerStatus::Draining,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkerStatus::Available => "available",
            WorkerStatus::Busy => "busy",
            WorkerStatus::Offline => "offline",
            WorkerStatus::Draining => "draining",
        }
    }

    /// Whether the scheduler may bind new work to this worker.
    pub fn accepts_work(self) -> bool {
        matches!(self, WorkerStatus::Available)
    }
}

crate::simple_display! {
    WorkerStatus {
        Available => "available",
        Busy => "busy",
        Offline => "offline",
        Draining => "draining",
    }
}

crate::simple_from_str! {
    WorkerStatus {
        "available" => Available,
        "busy" => Busy,
        "offline" => Offline,
        "draining" => Draining,
    }
}

/// Coarse machine classification from the hardware probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineClass {
    Laptop,
    Desktop,
    Server,
    Unknown,
}

impl Default for MachineClass {
    fn default() -> Self {
        MachineClass::Unknown
    }
}

crate::simple_display! {
    MachineClass {
        Laptop => "laptop",
        Desktop => "desktop",
        Server => "server",
        Unknown => "unknown",
    }
}

crate::simple_from_str! {
    MachineClass {
        "laptop" => Laptop,
        "desktop" => Desktop,
        "server" => Server,
        "unknown" => Unknown,
    }
}

/// Hardware declared at registration time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerCapabilities {
    pub cpu_threads: u32,
    pub cpu_model: String,
    pub has_gpu: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_type: Option<String>,
    pub ram_bytes: u64,
    #[serde(default)]
    pub machine_class: MachineClass,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

/// A registered worker node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerNode {
    pub id: WorkerId,
    pub tenant_id: TenantId,
    pub address: String,
    pub capabilities: WorkerCapabilities,
    pub status: WorkerStatus,
    /// Job currently bound to this node. Mirror of `Job::worker_id`;
    /// the two are only ever written together.
    pub current_job: Option<JobId>,
    pub last_heartbeat_ms: u64,
    pub registered_at_ms: u64,
}

impl WorkerNode {
    /// Whether this worker can execute the given job's hardware needs.
    pub fn can_run(&self, needs_gpu: bool) -> bool {
        !needs_gpu || self.capabilities.has_gpu
    }
}

crate::builder! {
    pub struct WorkerNodeBuilder => WorkerNode {
        into {
            id: WorkerId = WorkerId::from_string("wrk-test"),
            tenant_id: TenantId = crate::tenant::DEFAULT_TENANT,
            address: String = "10.0.0.1:0",
        }
        set {
            capabilities: WorkerCapabilities = WorkerCapabilities {
                cpu_threads: 8,
                cpu_model: "test-cpu".to_string(),
                has_gpu: false,
                gpu_type: None,
                ram_bytes: 16 * 1024 * 1024 * 1024,
                machine_class: MachineClass::Server,
                labels: HashMap::new(),
            },
            status: WorkerStatus = WorkerStatus::Available,
            last_heartbeat_ms: u64 = 1_000_000,
            registered_at_ms: u64 = 1_000_000,
        }
        option {
            current_job: JobId = None,
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
