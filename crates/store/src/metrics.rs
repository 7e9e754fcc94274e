// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregate counts for the metrics endpoint.
//!
//! One GROUP BY per table; never a row scan. The job query returns at most
//! |states| x |queues| x |priorities| rows however many jobs exist, which is
//! what keeps `/metrics` flat at 10^5+ jobs.

use crate::error::StoreError;
use crate::Store;
use recode_core::clock::Clock;
use recode_core::job::{JobStatus, Priority, QueueClass};
use recode_core::worker::WorkerStatus;
use sqlx::Row;
use std::collections::HashMap;

/// Job counts bucketed by (status, queue, priority).
#[derive(Debug, Clone, Default)]
pub struct JobMetrics {
    buckets: Vec<(JobStatus, QueueClass, Priority, i64)>,
}

impl JobMetrics {
    pub fn total_by_state(&self) -> HashMap<JobStatus, i64> {
        let mut totals = HashMap::new();
        for (status, _, _, n) in &self.buckets {
            *totals.entry(*status).or_insert(0) += n;
        }
        totals
    }

    /// Queue backlog (QUEUED jobs only) by queue class.
    pub fn queued_by_class(&self) -> HashMap<QueueClass, i64> {
        let mut totals = HashMap::new();
        for (status, queue, _, n) in &self.buckets {
            if *status == JobStatus::Queued {
                *totals.entry(*queue).or_insert(0) += n;
            }
        }
        totals
    }

    /// Queue backlog (QUEUED jobs only) by priority.
    pub fn queued_by_priority(&self) -> HashMap<Priority, i64> {
        let mut totals = HashMap::new();
        for (status, _, priority, n) in &self.buckets {
            if *status == JobStatus::Queued {
                *totals.entry(*priority).or_insert(0) += n;
            }
        }
        totals
    }

    pub fn queue_length(&self) -> i64 {
        self.queued_by_class().values().sum()
    }

    /// Jobs currently occupying a worker.
    pub fn active_jobs(&self) -> i64 {
        self.buckets
            .iter()
            .filter(|(status, ..)| status.is_on_worker())
            .map(|(_, _, _, n)| n)
            .sum()
    }
}

/// Worker counts by status.
#[derive(Debug, Clone, Default)]
pub struct WorkerMetrics {
    pub by_status: HashMap<WorkerStatus, i64>,
}

impl<C: Clock> Store<C> {
    /// Single aggregated query over `jobs`.
    pub async fn get_job_metrics(&self) -> Result<JobMetrics, StoreError> {
        let rows = sqlx::query(
            "SELECT status, queue, priority, COUNT(*) AS n
             FROM jobs GROUP BY status, queue, priority",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::query("job metrics"))?;

        let mut buckets = Vec::with_capacity(rows.len());
        for row in &rows {
            let status: String = row.try_get("status").map_err(StoreError::query("job metrics"))?;
            let queue: String = row.try_get("queue").map_err(StoreError::query("job metrics"))?;
            let priority: String =
                row.try_get("priority").map_err(StoreError::query("job metrics"))?;
            let n: i64 = row.try_get("n").map_err(StoreError::query("job metrics"))?;
            buckets.push((
                status.parse().map_err(StoreError::InvalidInput)?,
                queue.parse().map_err(StoreError::InvalidInput)?,
                priority.parse().map_err(StoreError::InvalidInput)?,
                n,
            ));
        }
        Ok(JobMetrics { buckets })
    }

    /// Single aggregated query over `workers`.
    pub async fn get_worker_metrics(&self) -> Result<WorkerMetrics, StoreError> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM workers GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::query("worker metrics"))?;

        let mut by_status = HashMap::new();
        for row in &rows {
            let status: String =
                row.try_get("status").map_err(StoreError::query("worker metrics"))?;
            let n: i64 = row.try_get("n").map_err(StoreError::query("worker metrics"))?;
            by_status.insert(status.parse().map_err(StoreError::InvalidInput)?, n);
        }
        Ok(WorkerMetrics { by_status })
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
