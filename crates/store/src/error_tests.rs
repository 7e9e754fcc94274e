// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use recode_core::job::JobStatus;

#[test]
fn messages_carry_context() {
    let err = StoreError::not_found("job", "job-abc");
    assert_eq!(err.to_string(), "job job-abc not found");

    let err = StoreError::QuotaExceeded { tenant: "acme".into(), what: "active jobs" };
    assert_eq!(err.to_string(), "quota exceeded for tenant acme: active jobs");

    let err = StoreError::TenantInactive("acme".into());
    assert_eq!(err.to_string(), "tenant acme is not active");
}

#[test]
fn invalid_transition_converts_transparently() {
    let inner = recode_core::fsm::InvalidTransition {
        from: JobStatus::Queued,
        to: JobStatus::Completed,
    };
    let err: StoreError = inner.into();
    assert_eq!(err.to_string(), "invalid transition queued -> completed");
}
