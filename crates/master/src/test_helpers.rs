// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for master tests: an in-memory store on a fake clock
//! plus ready-made state, specs, and workers.

use crate::env::MasterConfig;
use crate::metrics::Metrics;
use crate::state::AppState;
use recode_core::clock::FakeClock;
use recode_core::job::{EngineHint, JobParams, JobSpec, Priority, QueueClass, ResourceLimits};
use recode_core::tenant::TenantId;
use recode_core::worker::{MachineClass, WorkerCapabilities, WorkerNode};
use recode_store::{DbKind, Store};
use std::time::Duration;

pub(crate) const TEST_API_KEY: &str = "test-api-key";

pub(crate) fn test_config() -> MasterConfig {
    MasterConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        api_key: TEST_API_KEY.to_string(),
        db_kind: DbKind::Sqlite,
        db_dsn: "sqlite::memory:".to_string(),
        scheduler_interval: Duration::from_millis(100),
        reconcile_interval: Duration::from_millis(100),
        heartbeat_interval: Duration::from_secs(10),
        worker_failure_threshold: 3,
        schedule_batch: 100,
        max_retries: 4,
        retry_base_delay: Duration::from_secs(5),
        retry_max_delay: Duration::from_secs(300),
        transient_errors: Vec::new(),
        retention_age: Duration::from_secs(7 * 24 * 3600),
        retention_batch: 500,
        retention_interval: Duration::from_secs(60),
    }
}

pub(crate) async fn test_store() -> (Store<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    let store = Store::open(DbKind::Sqlite, "sqlite::memory:", clock.clone())
        .await
        .unwrap();
    (store, clock)
}

pub(crate) async fn test_state() -> (AppState<FakeClock>, FakeClock) {
    let (store, clock) = test_store().await;
    let state = AppState::new(store, Metrics::new().unwrap(), test_config());
    (state, clock)
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

pub(crate) async fn register_gpu_worker(store: &Store<FakeClock>) -> WorkerNode {
    store
        .register_worker(&TenantId::default_tenant(), "10.0.0.2:9000", capabilities(true))
        .await
        .unwrap()
}
