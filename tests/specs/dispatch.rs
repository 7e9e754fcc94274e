// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Twenty mixed-class jobs, ten workers: class order, FIFO within class,
//! one job per worker.

use super::prelude::*;
use std::collections::HashSet;

#[tokio::test]
async fn queue_classes_drain_in_order() {
    let (store, _) = open().await;

    // 7 live, 7 default, 6 batch, all medium priority, interleaved so
    // sequence alone cannot explain the outcome.
    let mut live = Vec::new();
    let mut default = Vec::new();
    let mut batch = Vec::new();
    for i in 0..20 {
        let class = match i % 3 {
            0 => QueueClass::Live,
            1 => QueueClass::Default,
            _ => QueueClass::Batch,
        };
        let job = store
            .create_job(classed_spec(class, Priority::Medium))
            .await
            .expect("submit");
        match class {
            QueueClass::Live => live.push(job),
            QueueClass::Default => default.push(job),
            QueueClass::Batch => batch.push(job),
        }
    }
    assert_eq!((live.len(), default.len(), batch.len()), (7, 7, 6));

    let mut workers = Vec::new();
    for _ in 0..10 {
        workers.push(register_worker(&store).await);
    }

    let stats = scheduler_tick(&store, 100).await.expect("tick");
    assert_eq!(stats.assigned, 10);

    // Every live job is on a worker before any batch job, and the three
    // default assignments are the lowest-sequence defaults.
    for job in &live {
        let current = store.get_job(&job.id).await.unwrap();
        assert_eq!(current.status, JobStatus::Assigned, "live job {} must go first", job.seq);
    }
    for job in &batch {
        let current = store.get_job(&job.id).await.unwrap();
        assert_eq!(current.status, JobStatus::Queued, "batch job {} must wait", job.seq);
    }
    let assigned_defaults: Vec<i64> = {
        let mut seqs = Vec::new();
        for job in &default {
            if store.get_job(&job.id).await.unwrap().status == JobStatus::Assigned {
                seqs.push(job.seq);
            }
        }
        seqs
    };
    let expected: Vec<i64> = default.iter().map(|j| j.seq).take(3).collect();
    assert_eq!(assigned_defaults, expected, "FIFO within the default class");

    // No worker holds two jobs.
    let mut bound = HashSet::new();
    for worker in &workers {
        let current = store.get_worker(&worker.id).await.unwrap();
        if let Some(job_id) = current.current_job {
            assert!(bound.insert(job_id), "job bound twice");
            assert_eq!(current.status, WorkerStatus::Busy);
        }
    }
    assert_eq!(bound.len(), 10);
}

#[tokio::test]
async fn priorities_order_within_a_class() {
    let (store, _) = open().await;
    let low = store.create_job(classed_spec(QueueClass::Live, Priority::Low)).await.unwrap();
    let high = store.create_job(classed_spec(QueueClass::Live, Priority::High)).await.unwrap();
    let medium = store.create_job(classed_spec(QueueClass::Live, Priority::Medium)).await.unwrap();

    register_worker(&store).await;
    scheduler_tick(&store, 100).await.expect("tick");

    assert_eq!(store.get_job(&high.id).await.unwrap().status, JobStatus::Assigned);
    assert_eq!(store.get_job(&medium.id).await.unwrap().status, JobStatus::Queued);
    assert_eq!(store.get_job(&low.id).await.unwrap().status, JobStatus::Queued);
}

#[tokio::test]
async fn all_twenty_jobs_eventually_complete() {
    let (store, _) = open().await;
    for i in 0..20 {
        let class = match i % 3 {
            0 => QueueClass::Live,
            1 => QueueClass::Default,
            _ => QueueClass::Batch,
        };
        store.create_job(classed_spec(class, Priority::Medium)).await.expect("submit");
    }
    let mut workers = Vec::new();
    for _ in 0..10 {
        workers.push(register_worker(&store).await);
    }

    // Tick, drain every worker, repeat: two waves cover twenty jobs.
    for _ in 0..3 {
        scheduler_tick(&store, 100).await.expect("tick");
        for worker in &workers {
            run_to_completion(&store, worker).await;
        }
    }

    assert_eq!(store.get_jobs_in_state(JobStatus::Completed).await.unwrap().len(), 20);
    assert!(store.get_queued_jobs(100).await.unwrap().is_empty());
}
