// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-cutting invariants checked after a turbulent run: crashes,
//! retries, cancels, and a scheduler racing a reconciler.

use super::prelude::*;
use recode_core::fsm::transition_verdict;
use std::collections::HashMap;

/// Every invariant the data model promises, asserted over the whole store.
async fn assert_invariants(store: &Store<FakeClock>) {
    let mut jobs = Vec::new();
    for status in JobStatus::ALL {
        jobs.extend(store.get_jobs_in_state(status).await.expect("list"));
    }
    let workers = store.list_workers(None).await.expect("workers");
    let by_id: HashMap<&str, &WorkerNode> =
        workers.iter().map(|w| (w.id.as_str(), w)).collect();

    let mut seqs: Vec<i64> = jobs.iter().map(|j| j.seq).collect();
    seqs.sort_unstable();
    let deduped = {
        let mut copy = seqs.clone();
        copy.dedup();
        copy
    };
    assert_eq!(seqs, deduped, "sequence numbers are unique");

    let mut bound_workers: HashMap<&str, &str> = HashMap::new();
    for job in &jobs {
        // Legal FSM path, starting from QUEUED.
        let mut state = JobStatus::Queued;
        for transition in &job.transitions {
            assert_eq!(transition.from, state, "job {} audit gap", job.id);
            transition_verdict(transition.from, transition.to)
                .unwrap_or_else(|e| panic!("job {} illegal audit edge: {e}", job.id));
            state = transition.to;
        }
        assert_eq!(state, job.status, "job {} status matches its trailing transition", job.id);

        if job.status.is_on_worker() {
            let worker_id = job.worker_id.as_ref().expect("on-worker job names its worker");
            let worker = by_id
                .get(worker_id.as_str())
                .unwrap_or_else(|| panic!("job {} references unknown worker", job.id));
            assert_eq!(
                worker.current_job.as_ref().map(|j| j.as_str()),
                Some(job.id.as_str()),
                "worker back-reference matches"
            );
            assert_eq!(worker.status, WorkerStatus::Busy);
            let previous = bound_workers.insert(worker_id.as_str(), job.id.as_str());
            assert!(previous.is_none(), "worker {} bound to two live jobs", worker_id);
        }

        if job.status == JobStatus::Completed {
            assert!(
                job.transitions.iter().any(|t| t.to == JobStatus::Assigned),
                "job {} completed without ever being assigned",
                job.id
            );
        }
    }

    for worker in &workers {
        if worker.status == WorkerStatus::Available {
            assert!(worker.current_job.is_none(), "available worker holds a job");
        }
    }
}

#[tokio::test]
async fn invariants_hold_through_a_turbulent_run() {
    let (store, clock) = open().await;
    let engine = retry_engine(3);

    let workers = [
        register_worker(&store).await,
        register_worker(&store).await,
        register_worker(&store).await,
    ];
    for i in 0..12 {
        let class = match i % 3 {
            0 => QueueClass::Live,
            1 => QueueClass::Default,
            _ => QueueClass::Batch,
        };
        store.create_job(classed_spec(class, Priority::Medium)).await.expect("submit");
    }

    for round in 0..6u64 {
        scheduler_tick(&store, 100).await.expect("tick");

        // Worker 0 completes, worker 1 fails transiently, worker 2 crashes
        // every other round.
        if let Some(job) = store.claim_next_job(&workers[0].id).await.expect("claim") {
            store.complete_job(&job.id, &workers[0].id).await.expect("complete");
        }
        if let Some(job) = store.claim_next_job(&workers[1].id).await.expect("claim") {
            engine
                .handle_failure_report(&store, &job.id, &workers[1].id, "network error: reset")
                .await
                .expect("report");
        }
        if round % 2 == 0 {
            if let Some(job) = store.claim_next_job(&workers[2].id).await.expect("claim") {
                // Crash: no report, heartbeats stop. Revive next round.
                let _ = job;
            }
        }

        // Cancel one queued job early on.
        if round == 1 {
            if let Some(job) = store.get_queued_jobs(1).await.expect("queued").pop() {
                store.cancel_job(&job.id, None).await.expect("cancel");
            }
        }

        clock.advance(HEARTBEAT * 4);
        for worker in &workers[..2] {
            let _ = store.heartbeat_worker(&worker.id, None).await;
        }
        reconcile_tick(&store, &engine, &reconcile_config()).await.expect("pass");
        // Worker 2 recovers and rejoins.
        let _ = store.heartbeat_worker(&workers[2].id, None).await;

        assert_invariants(&store).await;
    }
}
