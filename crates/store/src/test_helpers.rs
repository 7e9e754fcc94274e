// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for store tests: an in-memory SQLite store on a fake
//! clock, plus spec/worker shorthands.

use crate::{DbKind, Store};
use recode_core::clock::FakeClock;
use recode_core::job::{EngineHint, JobParams, JobSpec, Priority, QueueClass, ResourceLimits};
use recode_core::tenant::TenantId;
use recode_core::worker::{MachineClass, WorkerCapabilities, WorkerNode};

pub(crate) async fn test_store() -> (Store<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    let store = Store::open(DbKind::Sqlite, "sqlite::memory:", clock.clone())
        .await
        .unwrap();
    (store, clock)
}

pub(crate) fn spec() -> JobSpec {
    spec_for(TenantId::default_tenant())
}

pub(crate) fn spec_for(tenant_id: TenantId) -> JobSpec {
    JobSpec {
        tenant_id,
        scenario: "720p30-h264".to_string(),
        engine: EngineHint::Auto,
        parameters: JobParams::new(),
        queue: QueueClass::Default,
        priority: Priority::Medium,
        limits: ResourceLimits::default(),
    }
}

pub(crate) fn capabilities(has_gpu: bool) -> WorkerCapabilities {
    WorkerCapabilities {
        cpu_threads: 16,
        cpu_model: "test-cpu".to_string(),
        has_gpu,
        gpu_type: has_gpu.then(|| "nvidia-t4".to_string()),
        ram_bytes: 32 * 1024 * 1024 * 1024,
        machine_class: MachineClass::Server,
        labels: Default::default(),
    }
}

pub(crate) async fn register_worker(store: &Store<FakeClock>) -> WorkerNode {
    store
        .register_worker(&TenantId::default_tenant(), "10.0.0.1:9000", capabilities(false))
        .await
        .unwrap()
}
