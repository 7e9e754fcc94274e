// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn reserved_default_is_active_and_unlimited() {
    let tenant = Tenant::reserved_default(1_000);
    assert!(tenant.id.is_default());
    assert_eq!(tenant.name, DEFAULT_TENANT);
    assert!(tenant.admits(u64::MAX - 1));
    assert!(tenant.quota.admits_job(1_000_000));
    assert!(tenant.quota.admits_submission(1_000_000));
}

#[parameterized(
    active = { TenantStatus::Active, true },
    suspended = { TenantStatus::Suspended, false },
    expired = { TenantStatus::Expired, false },
)]
fn admission_follows_status(status: TenantStatus, admitted: bool) {
    let tenant = Tenant::builder().status(status).build();
    assert_eq!(tenant.admits(2_000_000), admitted);
}

#[test]
fn admission_respects_expiry_timestamp() {
    let tenant = Tenant::builder().expires_at_ms(5_000u64).build();
    assert!(tenant.admits(4_999));
    assert!(!tenant.admits(5_000));
}

#[test]
fn deleted_tenants_never_admit() {
    let tenant = Tenant::builder().deleted_at_ms(1u64).build();
    assert!(!tenant.admits(2_000_000));
}

#[test]
fn quota_zero_means_unlimited() {
    let quota = TenantQuota::default();
    assert!(quota.admits_job(i64::MAX - 1));
    assert!(quota.admits_worker(i64::MAX - 1));
}

#[test]
fn quota_limits_enforce_strictly() {
    let quota = TenantQuota { max_active_jobs: 2, max_jobs_per_hour: 3, max_workers: 1, ..Default::default() };
    assert!(quota.admits_job(1));
    assert!(!quota.admits_job(2));
    assert!(quota.admits_submission(2));
    assert!(!quota.admits_submission(3));
    assert!(!quota.admits_worker(1));
}
