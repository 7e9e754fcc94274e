// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker crash mid-job: orphan detection and re-execution.

use super::prelude::*;

#[tokio::test]
async fn crashed_worker_job_is_requeued_and_finished_elsewhere() {
    let (store, clock) = open().await;
    let engine = retry_engine(3);
    let doomed = register_worker(&store).await;

    let job = store.create_job(job_spec("720p30-h264")).await.expect("submit");
    scheduler_tick(&store, 100).await.expect("tick");
    store.claim_next_job(&doomed.id).await.expect("claim").expect("handed over");

    // The worker dies: heartbeats simply stop. Within the failure window
    // nothing happens yet.
    clock.advance(HEARTBEAT);
    let stats = reconcile_tick(&store, &engine, &reconcile_config()).await.expect("pass");
    assert_eq!(stats.workers_marked_dead, 0);

    // Past three missed intervals the worker is declared dead and the job
    // comes back with the attempt counted and the dead worker on record.
    clock.advance(HEARTBEAT * 3);
    let stats = reconcile_tick(&store, &engine, &reconcile_config()).await.expect("pass");
    assert_eq!(stats.workers_marked_dead, 1);
    assert_eq!(stats.orphans_requeued, 1);

    let requeued = store.get_job(&job.id).await.unwrap();
    assert_eq!(requeued.status, JobStatus::Queued);
    assert_eq!(requeued.retry_count, 1);
    assert!(requeued.worker_id.is_none());
    assert!(requeued
        .last_transition()
        .unwrap()
        .reason
        .contains(doomed.id.as_str()));
    assert_eq!(store.get_worker(&doomed.id).await.unwrap().status, WorkerStatus::Offline);

    // A fresh worker picks it up and completes it.
    let fresh = register_worker(&store).await;
    scheduler_tick(&store, 100).await.expect("tick");
    let done = run_to_completion(&store, &fresh).await.expect("second run");
    assert_eq!(done.id, job.id);
    assert_eq!(store.get_job(&job.id).await.unwrap().status, JobStatus::Completed);
}

#[tokio::test]
async fn recovered_workers_late_report_is_discarded() {
    let (store, clock) = open().await;
    let engine = retry_engine(3);
    let lazarus = register_worker(&store).await;

    let job = store.create_job(job_spec("720p30-h264")).await.expect("submit");
    scheduler_tick(&store, 100).await.expect("tick");
    store.claim_next_job(&lazarus.id).await.expect("claim");

    clock.advance(HEARTBEAT * 4);
    reconcile_tick(&store, &engine, &reconcile_config()).await.expect("pass");

    // The job runs again elsewhere.
    let fresh = register_worker(&store).await;
    scheduler_tick(&store, 100).await.expect("tick");
    store.claim_next_job(&fresh.id).await.expect("claim");

    // The original worker comes back and reports its (lost) completion:
    // the assignee check turns it into a no-op.
    store.heartbeat_worker(&lazarus.id, None).await.expect("revive");
    assert!(!store.complete_job(&job.id, &lazarus.id).await.expect("stale report"));
    assert_eq!(store.get_job(&job.id).await.unwrap().status, JobStatus::Running);

    // The real assignee's report still lands.
    assert!(store.complete_job(&job.id, &fresh.id).await.expect("real report"));
    assert_eq!(store.get_job(&job.id).await.unwrap().status, JobStatus::Completed);
}
