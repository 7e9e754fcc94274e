// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use recode_core::job::Priority;

#[test]
fn register_request_uses_type_on_the_wire() {
    let json = serde_json::json!({
        "address": "10.1.2.3:9000",
        "type": "server",
        "cpu_threads": 32,
        "cpu_model": "EPYC 7543",
        "has_gpu": true,
        "gpu_type": "nvidia-a10",
        "ram_bytes": 137438953472u64,
        "labels": {"rack": "b4"}
    });
    let req: RegisterNodeRequest = serde_json::from_value(json).unwrap();
    assert_eq!(req.machine_class, MachineClass::Server);
    assert_eq!(req.labels["rack"], "b4");

    let back = serde_json::to_value(&req).unwrap();
    assert_eq!(back["type"], "server");
}

#[test]
fn submit_job_defaults_are_empty() {
    let req: SubmitJobRequest = serde_json::from_str(r#"{"scenario": "720p30-h264"}"#).unwrap();
    assert!(req.engine.is_none());
    assert!(req.parameters.is_empty());
    assert!(req.queue.is_none());
    assert!(req.priority.is_none());
    assert!(req.resource_limits.is_none());
}

#[test]
fn submit_job_accepts_full_payload() {
    let req: SubmitJobRequest = serde_json::from_value(serde_json::json!({
        "scenario": "4k-hevc",
        "confidence": 0.9,
        "engine": "ffmpeg",
        "parameters": {"duration": 5},
        "queue": "live",
        "priority": "high",
        "resource_limits": {"max_cpu_percent": 200, "timeout_sec": 120}
    }))
    .unwrap();
    assert_eq!(req.priority, Some(Priority::High));
    assert_eq!(req.resource_limits.as_ref().unwrap().max_cpu_percent, Some(200));
}

#[test]
fn result_status_is_lowercase() {
    assert_eq!(serde_json::to_string(&ResultStatus::Completed).unwrap(), "\"completed\"");
    let parsed: ResultStatus = serde_json::from_str("\"failed\"").unwrap();
    assert_eq!(parsed, ResultStatus::Failed);
}

#[test]
fn tenant_update_is_sparse() {
    let req: TenantUpdateRequest = serde_json::from_str(r#"{"status": "suspended"}"#).unwrap();
    assert_eq!(req.status, Some(TenantStatus::Suspended));
    assert!(req.plan.is_none());
    assert!(req.quota.is_none());
}
