// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reconciler.
//!
//! The repair loop that runs regardless of what the happy path is doing:
//! declare silent workers dead, push their orphans back to QUEUED, enforce
//! deadlines from the master side, reclaim assignments nobody picked up,
//! drive the retry sweeps, and expire tenants. Every write re-checks its
//! precondition inside the store, so racing the scheduler is safe.

use crate::retry::RetryEngine;
use recode_core::clock::Clock;
use recode_core::job::JobStatus;
use recode_store::{Store, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What one pass repaired, for the log line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileStats {
    pub workers_marked_dead: usize,
    pub orphans_requeued: usize,
    pub jobs_timed_out: usize,
    pub assignments_reclaimed: usize,
    pub retries_requeued: u32,
    pub failed_reclassified: u32,
    pub tenants_expired: u64,
}

impl ReconcileStats {
    pub fn total(&self) -> u64 {
        self.workers_marked_dead as u64
            + self.orphans_requeued as u64
            + self.jobs_timed_out as u64
            + self.assignments_reclaimed as u64
            + self.retries_requeued as u64
            + self.failed_reclassified as u64
            + self.tenants_expired
    }
}

/// Tunables for one pass.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Worker silence window before it is declared dead.
    pub worker_failure_window: Duration,
    /// How long an ASSIGNED job may sit unclaimed before it goes back to
    /// QUEUED.
    pub assignment_grace: Duration,
}

/// One reconciliation pass.
pub async fn reconcile_tick<C: Clock>(
    store: &Store<C>,
    engine: &RetryEngine,
    config: &ReconcileConfig,
) -> Result<ReconcileStats, StoreError> {
    let mut stats = ReconcileStats::default();
    let now = store.now_ms();

    // Dead workers first, so their jobs show up in the orphan query.
    let cutoff = now.saturating_sub(config.worker_failure_window.as_millis() as u64);
    let dead = store.mark_dead_workers(cutoff).await?;
    stats.workers_marked_dead = dead.len();

    for job in store.get_orphaned_jobs().await? {
        let Some(worker_id) = job.worker_id else { continue };
        if store.requeue_orphan(&job.id, &worker_id).await? {
            tracing::warn!(job_id = %job.id, worker_id = %worker_id, "orphan re-queued");
            stats.orphans_requeued += 1;
        }
    }

    // Master-side deadline enforcement; the worker enforces the same
    // timeout locally. A job that finished between the read and the write
    // is skipped, not an error.
    for job in store.get_timed_out_jobs().await? {
        match store.fail_job_unattended(&job.id, "stale/timeout").await {
            Ok(true) => {
                tracing::warn!(job_id = %job.id, deadline_ms = job.deadline_ms(), "job failed on timeout");
                stats.jobs_timed_out += 1;
            }
            Ok(false) | Err(StoreError::InvalidTransition(_)) => {}
            Err(e) => return Err(e),
        }
    }

    // Assignments nobody claimed within the grace window go back to the
    // queue (the worker may have crashed between poll and start).
    let stale_cutoff = now.saturating_sub(config.assignment_grace.as_millis() as u64);
    for job in store.get_stale_jobs(stale_cutoff).await? {
        if job.status != JobStatus::Assigned {
            continue;
        }
        match store.requeue_job(&job.id, "assignment unclaimed").await {
            Ok(true) => {
                tracing::warn!(job_id = %job.id, "unclaimed assignment re-queued");
                stats.assignments_reclaimed += 1;
            }
            Ok(false) | Err(StoreError::InvalidTransition(_)) => {}
            Err(e) => return Err(e),
        }
    }

    stats.retries_requeued = engine.requeue_due(store).await?;
    stats.failed_reclassified = engine.sweep_failed(store).await?;
    stats.tenants_expired = store.expire_tenants().await?;

    Ok(stats)
}

/// The reconciler loop: one pass per interval until shutdown, with panic
/// containment per pass.
pub async fn run_reconciler<C: Clock>(
    store: Store<C>,
    engine: Arc<RetryEngine>,
    config: ReconcileConfig,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tracing::info!(interval_ms = interval.as_millis() as u64, "reconciler started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.cancelled() => {
                tracing::info!("reconciler stopped");
                return;
            }
        }

        let store = store.clone();
        let engine = Arc::clone(&engine);
        let config = config.clone();
        let pass =
            tokio::spawn(async move { reconcile_tick(&store, &engine, &config).await });
        match pass.await {
            Ok(Ok(stats)) => {
                if stats.total() > 0 {
                    tracing::info!(
                        workers_marked_dead = stats.workers_marked_dead,
                        orphans_requeued = stats.orphans_requeued,
                        jobs_timed_out = stats.jobs_timed_out,
                        assignments_reclaimed = stats.assignments_reclaimed,
                        retries_requeued = stats.retries_requeued,
                        failed_reclassified = stats.failed_reclassified,
                        tenants_expired = stats.tenants_expired,
                        "reconcile pass"
                    );
                }
            }
            Ok(Err(e)) => tracing::error!(error = %e, "reconcile pass failed"),
            Err(e) => tracing::error!(error = %e, "reconcile pass panicked"),
        }
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
