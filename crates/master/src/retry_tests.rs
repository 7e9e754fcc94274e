// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{register_worker, spec, test_config, test_store};
use recode_core::clock::FakeClock;
use recode_store::Store;

fn engine() -> RetryEngine {
    let config = test_config();
    RetryEngine::new(config.retry_policy(), config.transient_matcher())
}

async fn running_job(store: &Store<FakeClock>) -> (Job, WorkerId) {
    let job = store.create_job(spec()).await.unwrap();
    let worker = register_worker(store).await;
    store.assign_job_to_worker(&job.id, &worker.id).await.unwrap();
    store.claim_next_job(&worker.id).await.unwrap();
    (store.get_job(&job.id).await.unwrap(), worker.id)
}

#[tokio::test]
async fn transient_failure_is_parked_with_backoff() {
    let (store, clock) = test_store().await;
    let (job, worker_id) = running_job(&store).await;

    let disposition = engine()
        .handle_failure_report(&store, &job.id, &worker_id, "connection refused by origin")
        .await
        .unwrap();
    let FailureDisposition::Retrying { next_attempt_at_ms } = disposition else {
        panic!("expected retrying, got {disposition:?}");
    };
    // base 5s with ±20% jitter.
    let delta = next_attempt_at_ms - clock.epoch_ms();
    assert!((4_000..=6_000).contains(&delta), "delta {delta}ms");

    let job = store.get_job(&job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Retrying);
    assert_eq!(job.retry_count, 1);
}

#[tokio::test]
async fn permanent_failure_goes_terminal() {
    let (store, _) = test_store().await;
    let (job, worker_id) = running_job(&store).await;

    let disposition = engine()
        .handle_failure_report(&store, &job.id, &worker_id, "invalid codec parameters")
        .await
        .unwrap();
    assert_eq!(disposition, FailureDisposition::Permanent);
    assert_eq!(store.get_job(&job.id).await.unwrap().status, JobStatus::Failed);
}

#[tokio::test]
async fn transient_failures_exhaust_into_terminal_failed() {
    let (store, clock) = test_store().await;
    let job = store.create_job(spec()).await.unwrap();
    let worker = register_worker(&store).await;
    let engine = engine();

    // max_retries = 4: attempts 1-3 park, attempt 4 is terminal.
    for attempt in 1..=4u32 {
        store.assign_job_to_worker(&job.id, &worker.id).await.unwrap();
        store.claim_next_job(&worker.id).await.unwrap();
        let disposition = engine
            .handle_failure_report(&store, &job.id, &worker.id, "connection refused")
            .await
            .unwrap();

        let current = store.get_job(&job.id).await.unwrap();
        assert_eq!(current.retry_count, attempt);
        if attempt < 4 {
            assert!(matches!(disposition, FailureDisposition::Retrying { .. }));
            assert_eq!(current.status, JobStatus::Retrying);
            clock.advance(std::time::Duration::from_secs(3600));
            assert_eq!(engine.requeue_due(&store).await.unwrap(), 1);
        } else {
            assert_eq!(disposition, FailureDisposition::Permanent);
            assert_eq!(current.status, JobStatus::Failed);
        }
    }

    // Exhausted: the sweep leaves it alone even though the error reads
    // transient.
    assert_eq!(engine.sweep_failed(&store).await.unwrap(), 0);
    assert_eq!(store.get_job(&job.id).await.unwrap().status, JobStatus::Failed);
}

#[tokio::test]
async fn stale_reporter_is_ignored() {
    let (store, _) = test_store().await;
    let (job, _) = running_job(&store).await;
    let impostor = register_worker(&store).await;

    let disposition = engine()
        .handle_failure_report(&store, &job.id, &impostor.id, "connection refused")
        .await
        .unwrap();
    assert_eq!(disposition, FailureDisposition::Ignored);
    assert_eq!(store.get_job(&job.id).await.unwrap().status, JobStatus::Running);
}

#[tokio::test]
async fn sweep_reclassifies_transient_failed_jobs() {
    let (store, _) = test_store().await;
    let (job, worker_id) = running_job(&store).await;
    // Recorded as terminal (e.g. by an older policy), but the error text
    // reads transient.
    store.fail_job(&job.id, &worker_id, "upstream timeout").await.unwrap();

    assert_eq!(engine().sweep_failed(&store).await.unwrap(), 1);
    let job = store.get_job(&job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Retrying);
    // The failed attempt was already counted; reclassification adds none.
    assert_eq!(job.retry_count, 1);
}
