// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use axum::http::StatusCode;
use recode_core::fsm::InvalidTransition;
use recode_core::job::JobStatus;
use yare::parameterized;

#[parameterized(
    invalid_input = { StoreError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST },
    not_found = { StoreError::not_found("job", "job-x"), StatusCode::NOT_FOUND },
    conflict = { StoreError::Conflict("taken".into()), StatusCode::CONFLICT },
    tenant_inactive = { StoreError::TenantInactive("acme".into()), StatusCode::FORBIDDEN },
    quota = {
        StoreError::QuotaExceeded { tenant: "acme".into(), what: "active jobs" },
        StatusCode::TOO_MANY_REQUESTS
    },
)]
fn store_errors_map_to_statuses(error: StoreError, expected: StatusCode) {
    assert_eq!(status_for(&error), expected);
}

#[test]
fn invalid_transition_is_a_conflict() {
    let error = StoreError::InvalidTransition(InvalidTransition {
        from: JobStatus::Queued,
        to: JobStatus::Completed,
    });
    assert_eq!(status_for(&error), StatusCode::CONFLICT);
}
