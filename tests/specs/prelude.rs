// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the scenario specs.

#![allow(dead_code)]

pub use recode_core::clock::{Clock, FakeClock};
pub use recode_core::job::{
    EngineHint, Job, JobParams, JobSpec, JobStatus, Priority, QueueClass, ResourceLimits,
};
pub use recode_core::tenant::TenantId;
pub use recode_core::worker::{WorkerNode, WorkerStatus};
pub use recode_master::reconciler::{reconcile_tick, ReconcileConfig, ReconcileStats};
pub use recode_master::retry::FailureDisposition;
pub use recode_master::scheduler::{scheduler_tick, TickStats};
pub use recode_master::RetryEngine;
pub use recode_store::{DbKind, Store, StoreError};
pub use std::time::Duration;

pub const HEARTBEAT: Duration = Duration::from_secs(10);

/// Three missed heartbeats, the default failure threshold.
pub fn reconcile_config() -> ReconcileConfig {
    ReconcileConfig {
        worker_failure_window: HEARTBEAT * 3,
        assignment_grace: HEARTBEAT * 3,
    }
}

pub fn retry_engine(max_retries: u32) -> RetryEngine {
    RetryEngine::new(
        recode_core::retry::RetryPolicy {
            max_retries,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
        },
        recode_core::retry::TransientMatcher::default(),
    )
}

pub async fn open() -> (Store<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    let store = Store::open(DbKind::Sqlite, "sqlite::memory:", clock.clone())
        .await
        .expect("in-memory store");
    (store, clock)
}

pub fn job_spec(scenario: &str) -> JobSpec {
    JobSpec {
        tenant_id: TenantId::default_tenant(),
        scenario: scenario.to_string(),
        engine: EngineHint::Auto,
        parameters: JobParams::new(),
        queue: QueueClass::Default,
        priority: Priority::Medium,
        limits: ResourceLimits::default(),
    }
}

pub fn classed_spec(queue: QueueClass, priority: Priority) -> JobSpec {
    JobSpec { queue, priority, ..job_spec("720p30-h264") }
}

pub async fn register_worker(store: &Store<FakeClock>) -> WorkerNode {
    store
        .register_worker(
            &TenantId::default_tenant(),
            "10.0.0.1:9000",
            recode_core::worker::WorkerCapabilities {
                cpu_threads: 16,
                cpu_model: "spec-cpu".to_string(),
                has_gpu: false,
                gpu_type: None,
                ram_bytes: 32 * 1024 * 1024 * 1024,
                machine_class: recode_core::worker::MachineClass::Server,
                labels: Default::default(),
            },
        )
        .await
        .expect("register worker")
}

/// Drive one assigned job to COMPLETED through the worker-facing calls.
pub async fn run_to_completion(store: &Store<FakeClock>, worker: &WorkerNode) -> Option<Job> {
    let job = store.claim_next_job(&worker.id).await.expect("claim")?;
    store.complete_job(&job.id, &worker.id).await.expect("complete");
    Some(job)
}
