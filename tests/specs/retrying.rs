// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transient failures: backoff, re-queue, exhaustion.

use super::prelude::*;

#[tokio::test]
async fn connection_refused_retries_until_exhausted() {
    let (store, clock) = open().await;
    let engine = retry_engine(4);
    let worker = register_worker(&store).await;
    let job = store.create_job(job_spec("720p30-h264")).await.expect("submit");

    for attempt in 1..=4u32 {
        scheduler_tick(&store, 100).await.expect("tick");
        store.claim_next_job(&worker.id).await.expect("claim").expect("handed over");

        let disposition = engine
            .handle_failure_report(
                &store,
                &job.id,
                &worker.id,
                "connect to origin: connection refused",
            )
            .await
            .expect("report");

        let current = store.get_job(&job.id).await.unwrap();
        assert_eq!(current.retry_count, attempt);

        if attempt < 4 {
            let FailureDisposition::Retrying { next_attempt_at_ms } = disposition else {
                panic!("attempt {attempt} should park, got {disposition:?}");
            };
            assert_eq!(current.status, JobStatus::Retrying);
            assert!(next_attempt_at_ms > clock.epoch_ms());

            // The scheduler must not touch it while it waits.
            let stats = scheduler_tick(&store, 100).await.expect("tick");
            assert_eq!(stats.considered, 0);

            // Backoff elapses; the reconciler re-queues it.
            clock.advance(Duration::from_secs(3600));
            let stats =
                reconcile_tick(&store, &engine, &reconcile_config()).await.expect("pass");
            assert_eq!(stats.retries_requeued, 1);
            assert_eq!(store.get_job(&job.id).await.unwrap().status, JobStatus::Queued);
        } else {
            assert_eq!(disposition, FailureDisposition::Permanent);
            assert_eq!(current.status, JobStatus::Failed);
            assert_eq!(current.last_error.as_deref(), Some("connect to origin: connection refused"));
        }
    }

    // Exhausted for good: further passes leave it failed.
    let stats = reconcile_tick(&store, &engine, &reconcile_config()).await.expect("pass");
    assert_eq!(stats.failed_reclassified, 0);
    let done = store.get_job(&job.id).await.unwrap();
    assert_eq!(done.status, JobStatus::Failed);
    assert_eq!(done.retry_count, 4);
}

#[tokio::test]
async fn permanent_errors_never_retry() {
    let (store, _) = open().await;
    let engine = retry_engine(4);
    let worker = register_worker(&store).await;
    let job = store.create_job(job_spec("720p30-h264")).await.expect("submit");

    scheduler_tick(&store, 100).await.expect("tick");
    store.claim_next_job(&worker.id).await.expect("claim");

    let disposition = engine
        .handle_failure_report(&store, &job.id, &worker.id, "invalid crf value 99")
        .await
        .expect("report");
    assert_eq!(disposition, FailureDisposition::Permanent);

    let failed = store.get_job(&job.id).await.unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.retry_count, 1);
    assert_eq!(store.get_worker(&worker.id).await.unwrap().status, WorkerStatus::Available);
}
