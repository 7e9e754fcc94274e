// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant admission at the quota boundary.

use super::prelude::*;

#[tokio::test]
async fn admission_refuses_at_quota_and_recovers_after_completion() {
    let (store, _) = open().await;
    let acme = store
        .create_tenant(
            "acme",
            "standard",
            recode_core::tenant::TenantQuota { max_active_jobs: 2, ..Default::default() },
            None,
        )
        .await
        .expect("tenant");

    let spec = || JobSpec { tenant_id: acme.id, ..job_spec("720p30-h264") };
    let first = store.create_job(spec()).await.expect("first");
    store.create_job(spec()).await.expect("second");

    // At quota: refused with QuotaExceeded.
    let err = store.create_job(spec()).await.expect_err("third must be refused");
    assert!(matches!(err, StoreError::QuotaExceeded { what: "active jobs", .. }), "got {err:?}");

    // One job finishing frees the slot.
    let worker = register_worker(&store).await;
    store.assign_job_to_worker(&first.id, &worker.id).await.expect("assign");
    store.claim_next_job(&worker.id).await.expect("claim");
    store.complete_job(&first.id, &worker.id).await.expect("complete");

    store.create_job(spec()).await.expect("slot freed");
}

#[tokio::test]
async fn other_tenants_are_unaffected_by_a_full_one() {
    let (store, _) = open().await;
    let acme = store
        .create_tenant(
            "acme",
            "standard",
            recode_core::tenant::TenantQuota { max_active_jobs: 1, ..Default::default() },
            None,
        )
        .await
        .expect("tenant");

    store
        .create_job(JobSpec { tenant_id: acme.id, ..job_spec("720p30-h264") })
        .await
        .expect("fills acme");
    store
        .create_job(JobSpec { tenant_id: acme.id, ..job_spec("720p30-h264") })
        .await
        .expect_err("acme is full");

    // The default tenant keeps admitting.
    store.create_job(job_spec("720p30-h264")).await.expect("default unaffected");
}
