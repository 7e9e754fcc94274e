// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{register_worker, spec, test_store};
use recode_core::job::{Priority, QueueClass};

#[tokio::test]
async fn job_metrics_bucket_by_state_queue_priority() {
    let (store, _) = test_store().await;

    let mut live = spec();
    live.queue = QueueClass::Live;
    live.priority = Priority::High;
    store.create_job(live).await.unwrap();
    store.create_job(spec()).await.unwrap();
    let done = store.create_job(spec()).await.unwrap();

    let worker = register_worker(&store).await;
    store.assign_job_to_worker(&done.id, &worker.id).await.unwrap();
    store.claim_next_job(&worker.id).await.unwrap();
    store.complete_job(&done.id, &worker.id).await.unwrap();

    let metrics = store.get_job_metrics().await.unwrap();
    let by_state = metrics.total_by_state();
    assert_eq!(by_state.get(&JobStatus::Queued), Some(&2));
    assert_eq!(by_state.get(&JobStatus::Completed), Some(&1));

    assert_eq!(metrics.queue_length(), 2);
    assert_eq!(metrics.queued_by_class().get(&QueueClass::Live), Some(&1));
    assert_eq!(metrics.queued_by_priority().get(&Priority::High), Some(&1));
    assert_eq!(metrics.active_jobs(), 0);
}

#[tokio::test]
async fn active_jobs_counts_assigned_and_running() {
    let (store, _) = test_store().await;
    let job = store.create_job(spec()).await.unwrap();
    let worker = register_worker(&store).await;
    store.assign_job_to_worker(&job.id, &worker.id).await.unwrap();

    assert_eq!(store.get_job_metrics().await.unwrap().active_jobs(), 1);
    store.claim_next_job(&worker.id).await.unwrap();
    assert_eq!(store.get_job_metrics().await.unwrap().active_jobs(), 1);
}

#[tokio::test]
async fn worker_metrics_bucket_by_status() {
    let (store, _) = test_store().await;
    register_worker(&store).await;
    let busy = register_worker(&store).await;
    let job = store.create_job(spec()).await.unwrap();
    store.assign_job_to_worker(&job.id, &busy.id).await.unwrap();

    let metrics = store.get_worker_metrics().await.unwrap();
    use recode_core::worker::WorkerStatus;
    assert_eq!(metrics.by_status.get(&WorkerStatus::Available), Some(&1));
    assert_eq!(metrics.by_status.get(&WorkerStatus::Busy), Some(&1));
}
