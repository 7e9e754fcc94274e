// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatch scheduler.
//!
//! Each tick drains queued work onto eligible workers in queue-class,
//! priority, sequence order. Assignment goes through the store's atomic
//! operation, so a collision with the reconciler or a concurrent master
//! shows up as a Conflict and the tick simply moves to the next worker.

use crate::metrics::Metrics;
use recode_core::clock::Clock;
use recode_core::job::Job;
use recode_core::worker::{WorkerId, WorkerNode};
use recode_store::{Store, StoreError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What one tick did, for the scheduling log line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickStats {
    pub considered: usize,
    pub assigned: usize,
    /// Jobs that found no eligible worker this tick.
    pub unschedulable: usize,
    /// Assignments lost to concurrent writers.
    pub conflicts: usize,
}

/// One scheduler pass over at most `batch` queued jobs.
pub async fn scheduler_tick<C: Clock>(
    store: &Store<C>,
    batch: i64,
) -> Result<TickStats, StoreError> {
    let mut stats = TickStats::default();

    let queued = store.get_queued_jobs(batch).await?;
    stats.considered = queued.len();
    if queued.is_empty() {
        return Ok(stats);
    }

    let workers = store.get_available_workers().await?;
    let mut taken: HashSet<WorkerId> = HashSet::new();

    for job in &queued {
        let mut assigned = false;
        for worker in workers.iter() {
            if taken.contains(&worker.id) {
                continue;
            }
            if !eligible(worker, job) {
                continue;
            }
            match store.assign_job_to_worker(&job.id, &worker.id).await {
                Ok(true) => {
                    taken.insert(worker.id);
                    stats.assigned += 1;
                    assigned = true;
                    break;
                }
                Ok(false) => {
                    // Already bound to this worker by an earlier tick.
                    assigned = true;
                    break;
                }
                Err(StoreError::Conflict(message)) => {
                    // Worker raced away (or the job did); try the next one.
                    tracing::debug!(job_id = %job.id, worker_id = %worker.id, message, "assignment conflict");
                    taken.insert(worker.id);
                    stats.conflicts += 1;
                }
                Err(StoreError::InvalidTransition(_)) => {
                    // The job left QUEUED under us; nothing more to do here.
                    assigned = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        if !assigned {
            stats.unschedulable += 1;
        }
    }

    Ok(stats)
}

/// Tenant scoping and hardware fit, mirroring the store's own assignment
/// preconditions so most ineligible pairs never reach a transaction.
fn eligible(worker: &WorkerNode, job: &Job) -> bool {
    let tenant_ok = worker.tenant_id == job.tenant_id || worker.tenant_id.is_default();
    tenant_ok && worker.can_run(job.requires_gpu())
}

/// The scheduler loop: one tick per interval until shutdown. A panicking
/// tick is contained and the loop re-enters on the next interval.
pub async fn run_scheduler<C: Clock>(
    store: Store<C>,
    metrics: Arc<Metrics>,
    interval: Duration,
    batch: i64,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tracing::info!(interval_ms = interval.as_millis() as u64, batch, "scheduler started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.cancelled() => {
                tracing::info!("scheduler stopped");
                return;
            }
        }

        let store = store.clone();
        let tick = tokio::spawn(async move { scheduler_tick(&store, batch).await });
        match tick.await {
            Ok(Ok(stats)) => {
                if stats.considered > 0 {
                    tracing::info!(
                        considered = stats.considered,
                        assigned = stats.assigned,
                        unschedulable = stats.unschedulable,
                        conflicts = stats.conflicts,
                        "scheduler tick"
                    );
                }
                if stats.unschedulable > 0 {
                    metrics.jobs_unschedulable.with_label_values(&["all"]).inc_by(stats.unschedulable as u64);
                }
            }
            Ok(Err(e)) => tracing::error!(error = %e, "scheduler tick failed"),
            Err(e) => tracing::error!(error = %e, "scheduler tick panicked"),
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
