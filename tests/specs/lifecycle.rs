// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One job, one worker, straight through to completion.

use super::prelude::*;

#[tokio::test]
async fn single_job_runs_to_completion() {
    let (store, _) = open().await;
    let worker = register_worker(&store).await;

    let mut spec = job_spec("720p30-h264");
    spec.parameters.insert("duration".to_string(), serde_json::json!(5));
    let job = store.create_job(spec).await.expect("submit");
    assert_eq!(job.status, JobStatus::Queued);

    // Assigned within two ticks (the first suffices here).
    let stats = scheduler_tick(&store, 100).await.expect("tick");
    assert_eq!(stats.assigned, 1);
    assert_eq!(store.get_job(&job.id).await.unwrap().status, JobStatus::Assigned);

    // Worker polls, runs, reports success.
    let running = store.claim_next_job(&worker.id).await.expect("claim").expect("job handed over");
    assert_eq!(running.id, job.id);
    assert_eq!(running.status, JobStatus::Running);
    assert!(store.complete_job(&job.id, &worker.id).await.expect("complete"));

    let done = store.get_job(&job.id).await.unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert!(done.completed_at_ms.is_some());

    // Exactly three transitions: Queued→Assigned→Running→Completed.
    let path: Vec<JobStatus> = done.transitions.iter().map(|t| t.to).collect();
    assert_eq!(path, vec![JobStatus::Assigned, JobStatus::Running, JobStatus::Completed]);

    // The worker ends available with no job bound.
    let worker = store.get_worker(&worker.id).await.unwrap();
    assert_eq!(worker.status, WorkerStatus::Available);
    assert!(worker.current_job.is_none());
}

#[tokio::test]
async fn second_tick_finds_nothing_to_do() {
    let (store, _) = open().await;
    register_worker(&store).await;
    store.create_job(job_spec("720p30-h264")).await.expect("submit");

    scheduler_tick(&store, 100).await.expect("tick");
    let stats = scheduler_tick(&store, 100).await.expect("tick");
    assert_eq!(stats, TickStats::default());
}
