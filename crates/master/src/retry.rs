// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The retry engine.
//!
//! Classifies worker failure reports at arrival, before any terminal write
//! reaches the store. Transient failures with attempts remaining are parked
//! in RETRYING with a jittered exponential delay; everything else is failed
//! for good. The reconciler reuses the same engine for its sweeps.

use recode_core::clock::Clock;
use recode_core::job::{Job, JobId, JobStatus};
use recode_core::retry::{RetryPolicy, TransientMatcher};
use recode_core::worker::WorkerId;
use recode_store::{Store, StoreError};

/// Where a failure report ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Parked in RETRYING; scheduler ignores it until this moment.
    Retrying { next_attempt_at_ms: u64 },
    /// Terminal FAILED.
    Permanent,
    /// The report did not apply (stale worker, already terminal).
    Ignored,
}

pub struct RetryEngine {
    policy: RetryPolicy,
    matcher: TransientMatcher,
}

impl RetryEngine {
    pub fn new(policy: RetryPolicy, matcher: TransientMatcher) -> Self {
        Self { policy, matcher }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Handle a worker's failure report for `job_id`.
    pub async fn handle_failure_report<C: Clock>(
        &self,
        store: &Store<C>,
        job_id: &JobId,
        worker_id: &WorkerId,
        error: &str,
    ) -> Result<FailureDisposition, StoreError> {
        let job = store.get_job(job_id).await?;
        let attempt = job.retry_count + 1;

        if self.matcher.is_transient(error) && self.policy.allows_retry(attempt) {
            let delay = self.policy.delay(job.retry_count);
            let next_attempt_at_ms = store.now_ms() + delay.as_millis() as u64;
            let changed = store
                .mark_job_retrying(job_id, Some(worker_id), error, next_attempt_at_ms)
                .await?;
            if changed {
                tracing::info!(
                    job_id = %job_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error,
                    "transient failure, retry scheduled"
                );
                return Ok(FailureDisposition::Retrying { next_attempt_at_ms });
            }
            return Ok(FailureDisposition::Ignored);
        }

        let changed = store.fail_job(job_id, worker_id, error).await?;
        if changed {
            tracing::warn!(job_id = %job_id, attempt, error, "permanent failure");
            Ok(FailureDisposition::Permanent)
        } else {
            Ok(FailureDisposition::Ignored)
        }
    }

    /// Requeue RETRYING jobs whose backoff has elapsed. Returns how many
    /// moved. A job that raced into another state between the read and the
    /// write is skipped, not an error.
    pub async fn requeue_due<C: Clock>(&self, store: &Store<C>) -> Result<u32, StoreError> {
        let mut moved = 0;
        for job in store.get_due_retries().await? {
            match store.requeue_job(&job.id, "backoff elapsed").await {
                Ok(true) => moved += 1,
                Ok(false) | Err(StoreError::InvalidTransition(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(moved)
    }

    /// Reclassify FAILED jobs whose error reads transient and whose
    /// attempts are not exhausted. Returns how many moved.
    pub async fn sweep_failed<C: Clock>(&self, store: &Store<C>) -> Result<u32, StoreError> {
        let mut moved = 0;
        for job in store.get_jobs_in_state(JobStatus::Failed).await? {
            if !self.eligible_for_reclassification(&job) {
                continue;
            }
            let delay = self.policy.delay(job.retry_count.saturating_sub(1));
            let next_attempt_at_ms = store.now_ms() + delay.as_millis() as u64;
            let reason = format!(
                "reclassified transient: {}",
                job.last_error.as_deref().unwrap_or("unknown")
            );
            match store.mark_job_retrying(&job.id, None, &reason, next_attempt_at_ms).await {
                Ok(true) => {
                    tracing::info!(job_id = %job.id, retry_count = job.retry_count, "failed job reclassified for retry");
                    moved += 1;
                }
                Ok(false) | Err(StoreError::InvalidTransition(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(moved)
    }

    fn eligible_for_reclassification(&self, job: &Job) -> bool {
        let Some(error) = job.last_error.as_deref() else {
            return false;
        };
        self.matcher.is_transient(error) && job.retry_count < self.policy.max_retries
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
