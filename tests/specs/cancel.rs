// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User cancellation of a running job.

use super::prelude::*;

#[tokio::test]
async fn cancel_running_job_frees_worker_and_reaches_it_on_heartbeat() {
    let (store, _) = open().await;
    let worker = register_worker(&store).await;
    let job = store.create_job(job_spec("720p30-h264")).await.expect("submit");
    scheduler_tick(&store, 100).await.expect("tick");
    store.claim_next_job(&worker.id).await.expect("claim").expect("handed over");

    assert!(store.cancel_job(&job.id, None).await.expect("cancel"));

    let cancelled = store.get_job(&job.id).await.unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    assert!(cancelled.completed_at_ms.is_some());

    // The worker is freed immediately...
    let freed = store.get_worker(&worker.id).await.unwrap();
    assert_eq!(freed.status, WorkerStatus::Available);
    assert!(freed.current_job.is_none());

    // ...and learns about the teardown on its next heartbeat.
    let notices = store.heartbeat_worker(&worker.id, Some(&job.id)).await.expect("heartbeat");
    assert_eq!(notices, vec![job.id]);

    // Cancel is idempotent; the audit log does not grow.
    assert!(!store.cancel_job(&job.id, None).await.expect("repeat"));
    let after = store.get_job(&job.id).await.unwrap();
    assert_eq!(after.transitions.len(), cancelled.transitions.len());
}

#[tokio::test]
async fn cancelled_job_never_reopens() {
    let (store, _) = open().await;
    let job = store.create_job(job_spec("720p30-h264")).await.expect("submit");
    store.cancel_job(&job.id, None).await.expect("cancel");

    // Neither the scheduler nor a late worker report can move it.
    register_worker(&store).await;
    let stats = scheduler_tick(&store, 100).await.expect("tick");
    assert_eq!(stats.considered, 0);
    assert_eq!(store.get_job(&job.id).await.unwrap().status, JobStatus::Cancelled);
}
