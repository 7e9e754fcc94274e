// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record and its lifecycle vocabulary.
//!
//! A [`Job`] is one unit of transcoding work. Its `status` only ever moves
//! along the paths allowed by [`crate::fsm`], and every move appends a
//! [`StateTransition`] so the full history stays auditable.

use crate::scenario::{Scenario, GLOBAL_TIMEOUT_FLOOR};
use crate::tenant::TenantId;
use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

crate::define_id! {
    /// Unique identifier for a job.
    ///
    /// Jobs additionally carry a monotonic sequence number assigned by the
    /// store; the id is the external handle, the sequence the dispatch
    /// tiebreaker.
    pub struct JobId("job-");
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for the scheduler to pick a worker
    Queued,
    /// Bound to a worker, not yet picked up
    Assigned,
    /// Executing on its worker
    Running,
    /// Failed transiently, waiting out its backoff delay
    Retrying,
    /// Finished successfully (terminal)
    Completed,
    /// Finished unsuccessfully (terminal once retries are exhausted)
    Failed,
    /// Cancelled by a user (terminal)
    Cancelled,
}

impl JobStatus {
    /// All states, in display order. Used by the aggregate metrics query.
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Queued,
        JobStatus::Assigned,
        JobStatus::Running,
        JobStatus::Retrying,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];

    /// Terminal states are never left again.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }

    /// States in which the job occupies a worker.
    pub fn is_on_worker(self) -> bool {
        matches!(self, JobStatus::Assigned | JobStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Assigned => "assigned",
            JobStatus::Running => "running",
            JobStatus::Retrying => "retrying",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

crate::simple_display! {
    JobStatus {
        Queued => "queued",
        Assigned => "assigned",
        Running => "running",
        Retrying => "retrying",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

crate::simple_from_str! {
    JobStatus {
        "queued" => Queued,
        "assigned" => Assigned,
        "running" => Running,
        "retrying" => Retrying,
        "completed" => Completed,
        "failed" => Failed,
        "cancelled" => Cancelled,
    }
}

/// Coarse dispatch class. Live always drains before default, default before
/// batch, regardless of priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueClass {
    Live,
    Default,
    Batch,
}

impl QueueClass {
    /// Dispatch rank, lower drains first.
    pub fn rank(self) -> u8 {
        match self {
            QueueClass::Live => 0,
            QueueClass::Default => 1,
            QueueClass::Batch => 2,
        }
    }

    pub const ALL: [QueueClass; 3] = [QueueClass::Live, QueueClass::Default, QueueClass::Batch];

    pub fn as_str(self) -> &'static str {
        match self {
            QueueClass::Live => "live",
            QueueClass::Default => "default",
            QueueClass::Batch => "batch",
        }
    }
}

impl Default for QueueClass {
    fn default() -> Self {
        QueueClass::Default
    }
}

crate::simple_display! {
    QueueClass {
        Live => "live",
        Default => "default",
        Batch => "batch",
    }
}

crate::simple_from_str! {
    QueueClass {
        "live" => Live,
        "default" => Default,
        "batch" => Batch,
    }
}

/// Fine-grained priority within a queue class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Dispatch rank, lower drains first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

crate::simple_display! {
    Priority {
        High => "high",
        Medium => "medium",
        Low => "low",
    }
}

crate::simple_from_str! {
    Priority {
        "high" => High,
        "medium" => Medium,
        "low" => Low,
    }
}

/// Which transcoding engine the worker should invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineHint {
    Auto,
    Ffmpeg,
    Gstreamer,
}

impl Default for EngineHint {
    fn default() -> Self {
        EngineHint::Auto
    }
}

crate::simple_display! {
    EngineHint {
        Auto => "auto",
        Ffmpeg => "ffmpeg",
        Gstreamer => "gstreamer",
    }
}

crate::simple_from_str! {
    EngineHint {
        "auto" => Auto,
        "ffmpeg" => Ffmpeg,
        "gstreamer" => Gstreamer,
    }
}

/// Per-job resource ceilings, enforced by the governance wrapper and
/// preflight-checked by the worker agent. Absent fields mean "no limit".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cpu_percent: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_memory_mb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_disk_mb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_sec: Option<u64>,
}

/// Append-only audit record of one FSM move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: JobStatus,
    pub to: JobStatus,
    pub at_ms: u64,
    pub reason: String,
}

/// Free-form scenario parameters, persisted verbatim.
pub type JobParams = serde_json::Map<String, serde_json::Value>;

/// Submission payload, validated by the API and turned into a [`Job`] by the
/// store (which owns id and sequence assignment).
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub tenant_id: TenantId,
    pub scenario: String,
    pub engine: EngineHint,
    pub parameters: JobParams,
    pub queue: QueueClass,
    pub priority: Priority,
    pub limits: ResourceLimits,
}

/// A job instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Monotonic sequence number, the stable FIFO tiebreaker.
    pub seq: i64,
    pub tenant_id: TenantId,
    pub scenario: String,
    pub engine: EngineHint,
    pub parameters: JobParams,
    pub status: JobStatus,
    pub queue: QueueClass,
    pub priority: Priority,
    /// Worker currently bound to this job. Updated only together with
    /// `status` inside a store transaction.
    pub worker_id: Option<WorkerId>,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub limits: ResourceLimits,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub last_activity_ms: u64,
    pub completed_at_ms: Option<u64>,
    /// Earliest moment a retrying job may be re-queued.
    pub next_attempt_at_ms: Option<u64>,
    /// Ordered FSM audit log.
    pub transitions: Vec<StateTransition>,
}

impl Job {
    /// Build a fresh QUEUED job from a submission.
    ///
    /// The transition list starts empty: creation is not a move, so a job
    /// that runs straight through to completion ends with exactly three
    /// entries.
    pub fn from_spec(id: JobId, seq: i64, spec: JobSpec, epoch_ms: u64) -> Self {
        Self {
            id,
            seq,
            tenant_id: spec.tenant_id,
            scenario: spec.scenario,
            engine: spec.engine,
            parameters: spec.parameters,
            status: JobStatus::Queued,
            queue: spec.queue,
            priority: spec.priority,
            worker_id: None,
            retry_count: 0,
            last_error: None,
            limits: spec.limits,
            created_at_ms: epoch_ms,
            started_at_ms: None,
            last_activity_ms: epoch_ms,
            completed_at_ms: None,
            next_attempt_at_ms: None,
            transitions: Vec::new(),
        }
    }

    /// Append an audit record and flip the status. Callers must have
    /// validated the move through [`crate::fsm::transition_verdict`] first.
    pub fn push_transition(&mut self, to: JobStatus, reason: impl Into<String>, at_ms: u64) {
        self.transitions.push(StateTransition {
            from: self.status,
            to,
            at_ms,
            reason: reason.into(),
        });
        self.status = to;
    }

    pub fn last_transition(&self) -> Option<&StateTransition> {
        self.transitions.last()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether dispatch must pick a GPU-capable worker.
    ///
    /// True when the scenario demands a GPU or the parameters carry a
    /// truthy `gpu`/`hwaccel` flag.
    pub fn requires_gpu(&self) -> bool {
        if Scenario::for_name(&self.scenario).needs_gpu {
            return true;
        }
        for key in ["gpu", "hwaccel"] {
            match self.parameters.get(key) {
                Some(serde_json::Value::Bool(true)) => return true,
                Some(serde_json::Value::String(s)) if !s.is_empty() && s != "none" => return true,
                _ => {}
            }
        }
        false
    }

    /// Effective wall-clock timeout: the largest of the per-job limit, the
    /// scenario default, and the global floor.
    pub fn effective_timeout(&self) -> Duration {
        let scenario = Scenario::for_name(&self.scenario).default_timeout;
        let requested = self.limits.timeout_sec.map(Duration::from_secs).unwrap_or(Duration::ZERO);
        requested.max(scenario).max(GLOBAL_TIMEOUT_FLOOR)
    }

    /// Deadline in epoch milliseconds, measured from when execution started
    /// (falling back to creation for jobs that never started).
    pub fn deadline_ms(&self) -> u64 {
        let start = self.started_at_ms.unwrap_or(self.created_at_ms);
        start + self.effective_timeout().as_millis() as u64
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            id: JobId = JobId::from_string("job-test"),
            tenant_id: TenantId = crate::tenant::DEFAULT_TENANT,
            scenario: String = "720p30-h264",
        }
        set {
            seq: i64 = 1,
            engine: EngineHint = EngineHint::Auto,
            parameters: JobParams = JobParams::new(),
            status: JobStatus = JobStatus::Queued,
            queue: QueueClass = QueueClass::Default,
            priority: Priority = Priority::Medium,
            retry_count: u32 = 0,
            limits: ResourceLimits = ResourceLimits::default(),
            created_at_ms: u64 = 1_000_000,
            last_activity_ms: u64 = 1_000_000,
            transitions: Vec<StateTransition> = Vec::new(),
        }
        option {
            worker_id: WorkerId = None,
            last_error: String = None,
            started_at_ms: u64 = None,
            completed_at_ms: u64 = None,
            next_attempt_at_ms: u64 = None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
