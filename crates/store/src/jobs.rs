// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job operations: creation, FSM moves, dispatch reads.
//!
//! Every mutation re-reads the job inside its own transaction and re-checks
//! the FSM before writing, so concurrent scheduler/reconciler/worker calls
//! collapse into a serial history per job. All moves append to the
//! `state_transitions` audit column in the same statement batch as the
//! status flip.

use crate::error::StoreError;
use crate::rows::{job_from_row, to_json};
use crate::Store;
use recode_core::clock::Clock;
use recode_core::fsm::{transition_verdict, TransitionVerdict};
use recode_core::job::{Job, JobId, JobSpec, JobStatus, Priority, QueueClass};
use recode_core::tenant::TenantId;
use recode_core::worker::{WorkerId, WorkerNode};
use sqlx::{Any, Transaction};

/// One hour, for the rolling submission-rate quota.
const HOUR_MS: u64 = 3_600_000;

/// How long a cancelled job keeps appearing in its worker's heartbeat
/// replies. Workers that already tore the job down ignore the repeat.
pub(crate) const CANCEL_NOTIFY_WINDOW_MS: u64 = 15 * 60 * 1000;

const NON_TERMINAL: &str = "('queued','assigned','running','retrying')";

/// Filters for `list_jobs`. `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub tenant_id: Option<TenantId>,
    pub status: Option<JobStatus>,
    pub queue: Option<QueueClass>,
    pub priority: Option<Priority>,
    pub limit: Option<i64>,
}

impl<C: Clock> Store<C> {
    /// Create a job in QUEUED after admission passes.
    ///
    /// The sequence bump and the INSERT share one transaction, which is what
    /// makes sequence numbers unique under concurrent submissions.
    pub async fn create_job(&self, spec: JobSpec) -> Result<Job, StoreError> {
        if spec.scenario.trim().is_empty() {
            return Err(StoreError::InvalidInput("scenario must not be empty".into()));
        }

        let now = self.now_ms();
        let mut tx = self.pool.begin().await.map_err(StoreError::query("create_job begin"))?;

        let tenant = self.fetch_tenant_tx(&mut tx, spec.tenant_id.as_str()).await?;
        if !tenant.admits(now) {
            return Err(StoreError::TenantInactive(tenant.id.to_string()));
        }

        let active: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM jobs WHERE tenant_id = $1 AND status IN {NON_TERMINAL}"
        ))
        .bind(tenant.id.as_str().to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::query("create_job active count"))?;
        if !tenant.quota.admits_job(active) {
            return Err(StoreError::QuotaExceeded {
                tenant: tenant.id.to_string(),
                what: "active jobs",
            });
        }

        let recent: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM jobs WHERE tenant_id = $1 AND created_at_ms >= $2",
        )
        .bind(tenant.id.as_str().to_string())
        .bind(now.saturating_sub(HOUR_MS) as i64)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::query("create_job hourly count"))?;
        if !tenant.quota.admits_submission(recent) {
            return Err(StoreError::QuotaExceeded {
                tenant: tenant.id.to_string(),
                what: "hourly submissions",
            });
        }

        let seq: i64 =
            sqlx::query_scalar("UPDATE sequences SET value = value + 1 WHERE name = 'jobs' RETURNING value")
                .fetch_one(&mut *tx)
                .await
                .map_err(StoreError::query("create_job sequence"))?;

        let job = Job::from_spec(JobId::generate(), seq, spec, now);
        sqlx::query(
            "INSERT INTO jobs (id, seq, tenant_id, scenario, engine, parameters, status,
                queue, queue_rank, priority, priority_rank, worker_id, retry_count,
                last_error, limits, created_at_ms, started_at_ms, last_activity_ms,
                completed_at_ms, next_attempt_at_ms, state_transitions)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NULL, 0,
                NULL, $12, $13, NULL, $14, NULL, NULL, $15)",
        )
        .bind(job.id.as_str().to_string())
        .bind(job.seq)
        .bind(job.tenant_id.as_str().to_string())
        .bind(job.scenario.clone())
        .bind(job.engine.to_string())
        .bind(to_json(&job.parameters, "parameters")?)
        .bind(job.status.as_str())
        .bind(job.queue.as_str())
        .bind(job.queue.rank() as i64)
        .bind(job.priority.as_str())
        .bind(job.priority.rank() as i64)
        .bind(to_json(&job.limits, "limits")?)
        .bind(job.created_at_ms as i64)
        .bind(job.last_activity_ms as i64)
        .bind(to_json(&job.transitions, "state_transitions")?)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::query("create_job insert"))?;

        tx.commit().await.map_err(StoreError::query("create_job commit"))?;

        tracing::info!(
            job_id = %job.id,
            seq = job.seq,
            tenant = %job.tenant_id,
            scenario = %job.scenario,
            queue = %job.queue,
            priority = %job.priority,
            "job created"
        );
        Ok(job)
    }

    pub async fn get_job(&self, id: &JobId) -> Result<Job, StoreError> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = $1")
            .bind(id.as_str().to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::query("get_job"))?
            .ok_or_else(|| StoreError::not_found("job", id.as_str()))?;
        job_from_row(&row)
    }

    /// Generic FSM move. Returns `false` when the job is already in the
    /// target state, so retried requests are harmless.
    pub async fn transition_job_state(
        &self,
        id: &JobId,
        to: JobStatus,
        reason: &str,
    ) -> Result<bool, StoreError> {
        let now = self.now_ms();
        let mut tx = self.pool.begin().await.map_err(StoreError::query("transition begin"))?;

        let mut job = self.fetch_job_tx(&mut tx, id).await?;
        match transition_verdict(job.status, to)? {
            TransitionVerdict::Unchanged => return Ok(false),
            TransitionVerdict::Apply => {}
        }

        // Leaving the worker-bound states releases the worker; the two
        // references always move together.
        if job.status.is_on_worker() && !to.is_on_worker() {
            if let Some(worker_id) = job.worker_id {
                self.free_worker_tx(&mut tx, &worker_id, id).await?;
            }
        }
        if matches!(to, JobStatus::Queued | JobStatus::Retrying) {
            job.worker_id = None;
            sqlx::query("UPDATE jobs SET worker_id = NULL WHERE id = $1")
                .bind(id.as_str().to_string())
                .execute(&mut *tx)
                .await
                .map_err(StoreError::query("transition clear worker"))?;
        }
        if to == JobStatus::Running && job.started_at_ms.is_none() {
            sqlx::query("UPDATE jobs SET started_at_ms = $1 WHERE id = $2")
                .bind(now as i64)
                .bind(id.as_str().to_string())
                .execute(&mut *tx)
                .await
                .map_err(StoreError::query("transition started_at"))?;
        }
        if to.is_terminal() {
            sqlx::query("UPDATE jobs SET completed_at_ms = $1 WHERE id = $2")
                .bind(now as i64)
                .bind(id.as_str().to_string())
                .execute(&mut *tx)
                .await
                .map_err(StoreError::query("transition completed_at"))?;
        }

        self.apply_transition_tx(&mut tx, &mut job, to, reason, now).await?;
        tx.commit().await.map_err(StoreError::query("transition commit"))?;
        Ok(true)
    }

    /// Bind a QUEUED job to an available worker. The job move, the worker
    /// flip to busy, and both cross-references commit together.
    pub async fn assign_job_to_worker(
        &self,
        job_id: &JobId,
        worker_id: &WorkerId,
    ) -> Result<bool, StoreError> {
        let now = self.now_ms();
        let mut tx = self.pool.begin().await.map_err(StoreError::query("assign begin"))?;

        let mut job = self.fetch_job_tx(&mut tx, job_id).await?;
        let worker = self.fetch_worker_tx(&mut tx, worker_id).await?;

        if job.status == JobStatus::Assigned && job.worker_id.as_ref() == Some(worker_id) {
            return Ok(false);
        }
        match transition_verdict(job.status, JobStatus::Assigned)? {
            TransitionVerdict::Unchanged => {
                // Assigned, but to a different worker.
                return Err(StoreError::Conflict(format!(
                    "job {} already assigned to another worker",
                    job_id
                )));
            }
            TransitionVerdict::Apply => {}
        }
        if !worker.status.accepts_work() {
            return Err(StoreError::Conflict(format!(
                "worker {} is {}",
                worker_id, worker.status
            )));
        }
        if worker.tenant_id != job.tenant_id && !worker.tenant_id.is_default() {
            return Err(StoreError::Conflict(format!(
                "worker {} belongs to tenant {}",
                worker_id, worker.tenant_id
            )));
        }

        sqlx::query("UPDATE jobs SET worker_id = $1, last_activity_ms = $2 WHERE id = $3")
            .bind(worker_id.as_str().to_string())
            .bind(now as i64)
            .bind(job_id.as_str().to_string())
            .execute(&mut *tx)
            .await
            .map_err(StoreError::query("assign job update"))?;
        sqlx::query("UPDATE workers SET status = 'busy', current_job = $1 WHERE id = $2")
            .bind(job_id.as_str().to_string())
            .bind(worker_id.as_str().to_string())
            .execute(&mut *tx)
            .await
            .map_err(StoreError::query("assign worker update"))?;

        let reason = format!("assigned to worker {}", worker_id);
        self.apply_transition_tx(&mut tx, &mut job, JobStatus::Assigned, &reason, now).await?;
        tx.commit().await.map_err(StoreError::query("assign commit"))?;
        Ok(true)
    }

    /// Worker poll: hand over the job assigned to this worker, flipping it
    /// to RUNNING in the same transaction.
    pub async fn claim_next_job(&self, worker_id: &WorkerId) -> Result<Option<Job>, StoreError> {
        let now = self.now_ms();
        let mut tx = self.pool.begin().await.map_err(StoreError::query("claim begin"))?;

        let sql = format!(
            "SELECT * FROM jobs WHERE worker_id = $1 AND status = 'assigned'
             ORDER BY seq LIMIT 1{}",
            self.lock_clause()
        );
        let Some(row) = sqlx::query(&sql)
            .bind(worker_id.as_str().to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(StoreError::query("claim select"))?
        else {
            return Ok(None);
        };
        let mut job = job_from_row(&row)?;

        sqlx::query(
            "UPDATE jobs SET started_at_ms = $1, last_activity_ms = $1 WHERE id = $2",
        )
        .bind(now as i64)
        .bind(job.id.as_str().to_string())
        .execute(&mut *tx)
        .await
        .map_err(StoreError::query("claim update"))?;

        self.apply_transition_tx(&mut tx, &mut job, JobStatus::Running, "worker started execution", now)
            .await?;
        tx.commit().await.map_err(StoreError::query("claim commit"))?;

        job.started_at_ms = Some(now);
        job.last_activity_ms = now;
        Ok(Some(job))
    }

    /// Success report. Only the assignee's report moves the job; anyone
    /// else's (a recovered worker whose job was reassigned, a double send)
    /// is a no-op.
    pub async fn complete_job(
        &self,
        job_id: &JobId,
        worker_id: &WorkerId,
    ) -> Result<bool, StoreError> {
        let now = self.now_ms();
        let mut tx = self.pool.begin().await.map_err(StoreError::query("complete begin"))?;

        let mut job = self.fetch_job_tx(&mut tx, job_id).await?;
        if job.worker_id.as_ref() != Some(worker_id) || job.is_terminal() {
            return Ok(false);
        }
        match job.status {
            JobStatus::Running => {}
            JobStatus::Assigned => {
                // Report raced ahead of the poll handoff; record the start
                // so the audit trail stays a legal path.
                self.apply_transition_tx(
                    &mut tx,
                    &mut job,
                    JobStatus::Running,
                    "started (completion report)",
                    now,
                )
                .await?;
            }
            _ => return Ok(false),
        }

        sqlx::query("UPDATE jobs SET completed_at_ms = $1, last_activity_ms = $1 WHERE id = $2")
            .bind(now as i64)
            .bind(job_id.as_str().to_string())
            .execute(&mut *tx)
            .await
            .map_err(StoreError::query("complete update"))?;
        self.free_worker_tx(&mut tx, worker_id, job_id).await?;

        let reason = format!("completed by worker {}", worker_id);
        self.apply_transition_tx(&mut tx, &mut job, JobStatus::Completed, &reason, now).await?;
        tx.commit().await.map_err(StoreError::query("complete commit"))?;
        Ok(true)
    }

    /// Terminal failure report. The retry engine has already decided this
    /// failure is final; transient failures go through
    /// [`Store::mark_job_retrying`] instead.
    pub async fn fail_job(
        &self,
        job_id: &JobId,
        worker_id: &WorkerId,
        reason: &str,
    ) -> Result<bool, StoreError> {
        let now = self.now_ms();
        let mut tx = self.pool.begin().await.map_err(StoreError::query("fail begin"))?;

        let mut job = self.fetch_job_tx(&mut tx, job_id).await?;
        if job.worker_id.as_ref() != Some(worker_id) || job.is_terminal() {
            return Ok(false);
        }
        match job.status {
            JobStatus::Running => {}
            JobStatus::Assigned => {
                self.apply_transition_tx(
                    &mut tx,
                    &mut job,
                    JobStatus::Running,
                    "started (failure report)",
                    now,
                )
                .await?;
            }
            _ => return Ok(false),
        }

        sqlx::query(
            "UPDATE jobs SET completed_at_ms = $1, last_activity_ms = $1,
                retry_count = retry_count + 1, last_error = $2 WHERE id = $3",
        )
        .bind(now as i64)
        .bind(reason.to_string())
        .bind(job_id.as_str().to_string())
        .execute(&mut *tx)
        .await
        .map_err(StoreError::query("fail update"))?;
        self.free_worker_tx(&mut tx, worker_id, job_id).await?;

        self.apply_transition_tx(&mut tx, &mut job, JobStatus::Failed, reason, now).await?;
        tx.commit().await.map_err(StoreError::query("fail commit"))?;
        Ok(true)
    }

    /// Master-side failure (timeout enforcement, exhausted retries). No
    /// reporter to authorize; the FSM still gates the move.
    pub async fn fail_job_unattended(
        &self,
        job_id: &JobId,
        reason: &str,
    ) -> Result<bool, StoreError> {
        let now = self.now_ms();
        let mut tx = self.pool.begin().await.map_err(StoreError::query("fail begin"))?;

        let mut job = self.fetch_job_tx(&mut tx, job_id).await?;
        match transition_verdict(job.status, JobStatus::Failed)? {
            TransitionVerdict::Unchanged => return Ok(false),
            TransitionVerdict::Apply => {}
        }
        let consumed_attempt = job.status == JobStatus::Running;

        if let Some(worker_id) = job.worker_id {
            self.free_worker_tx(&mut tx, &worker_id, job_id).await?;
        }
        sqlx::query(
            "UPDATE jobs SET completed_at_ms = $1, last_activity_ms = $1,
                retry_count = retry_count + $2, last_error = $3 WHERE id = $4",
        )
        .bind(now as i64)
        .bind(if consumed_attempt { 1i64 } else { 0i64 })
        .bind(reason.to_string())
        .bind(job_id.as_str().to_string())
        .execute(&mut *tx)
        .await
        .map_err(StoreError::query("fail update"))?;

        self.apply_transition_tx(&mut tx, &mut job, JobStatus::Failed, reason, now).await?;
        tx.commit().await.map_err(StoreError::query("fail commit"))?;
        Ok(true)
    }

    /// Transient failure: park the job in RETRYING until `next_attempt_at`.
    ///
    /// With `reporter` set, the move is authorized like a failure report and
    /// counts the consumed attempt. Without it (the reconciler reclassifying
    /// a FAILED job whose attempt was already counted) only the FSM gates
    /// the move and the count stays put.
    pub async fn mark_job_retrying(
        &self,
        job_id: &JobId,
        reporter: Option<&WorkerId>,
        reason: &str,
        next_attempt_at_ms: u64,
    ) -> Result<bool, StoreError> {
        let now = self.now_ms();
        let mut tx = self.pool.begin().await.map_err(StoreError::query("retrying begin"))?;

        let mut job = self.fetch_job_tx(&mut tx, job_id).await?;
        if let Some(worker_id) = reporter {
            if job.worker_id.as_ref() != Some(worker_id) {
                return Ok(false);
            }
        }
        match transition_verdict(job.status, JobStatus::Retrying)? {
            TransitionVerdict::Unchanged => return Ok(false),
            TransitionVerdict::Apply => {}
        }
        let consumed_attempt = job.status == JobStatus::Running;

        if let Some(worker_id) = job.worker_id.take() {
            self.free_worker_tx(&mut tx, &worker_id, job_id).await?;
        }
        sqlx::query(
            "UPDATE jobs SET worker_id = NULL, retry_count = retry_count + $1,
                last_error = $2, next_attempt_at_ms = $3, last_activity_ms = $4,
                completed_at_ms = NULL WHERE id = $5",
        )
        .bind(if consumed_attempt { 1i64 } else { 0i64 })
        .bind(reason.to_string())
        .bind(next_attempt_at_ms as i64)
        .bind(now as i64)
        .bind(job_id.as_str().to_string())
        .execute(&mut *tx)
        .await
        .map_err(StoreError::query("retrying update"))?;

        self.apply_transition_tx(&mut tx, &mut job, JobStatus::Retrying, reason, now).await?;
        tx.commit().await.map_err(StoreError::query("retrying commit"))?;
        Ok(true)
    }

    /// Move a RETRYING job whose backoff elapsed (or an ASSIGNED job whose
    /// worker rejected it) back to QUEUED.
    pub async fn requeue_job(&self, job_id: &JobId, reason: &str) -> Result<bool, StoreError> {
        let now = self.now_ms();
        let mut tx = self.pool.begin().await.map_err(StoreError::query("requeue begin"))?;

        let mut job = self.fetch_job_tx(&mut tx, job_id).await?;
        match transition_verdict(job.status, JobStatus::Queued)? {
            TransitionVerdict::Unchanged => return Ok(false),
            TransitionVerdict::Apply => {}
        }

        if let Some(worker_id) = job.worker_id.take() {
            self.free_worker_tx(&mut tx, &worker_id, job_id).await?;
        }
        sqlx::query(
            "UPDATE jobs SET worker_id = NULL, next_attempt_at_ms = NULL,
                last_activity_ms = $1 WHERE id = $2",
        )
        .bind(now as i64)
        .bind(job_id.as_str().to_string())
        .execute(&mut *tx)
        .await
        .map_err(StoreError::query("requeue update"))?;

        self.apply_transition_tx(&mut tx, &mut job, JobStatus::Queued, reason, now).await?;
        tx.commit().await.map_err(StoreError::query("requeue commit"))?;
        Ok(true)
    }

    /// Recover a job stranded on a dead worker.
    ///
    /// ASSIGNED jobs go straight back to QUEUED. RUNNING jobs route through
    /// RETRYING in the same transaction so the audit history stays a legal
    /// path; their output is assumed lost either way. The consumed attempt
    /// is counted.
    pub async fn requeue_orphan(
        &self,
        job_id: &JobId,
        dead_worker: &WorkerId,
    ) -> Result<bool, StoreError> {
        let now = self.now_ms();
        let mut tx = self.pool.begin().await.map_err(StoreError::query("orphan begin"))?;

        let mut job = self.fetch_job_tx(&mut tx, job_id).await?;
        if !job.status.is_on_worker() || job.worker_id.as_ref() != Some(dead_worker) {
            return Ok(false);
        }

        let reason = format!("worker {} died", dead_worker);
        if job.status == JobStatus::Running {
            self.apply_transition_tx(&mut tx, &mut job, JobStatus::Retrying, &reason, now).await?;
        }
        sqlx::query(
            "UPDATE jobs SET worker_id = NULL, retry_count = retry_count + 1,
                next_attempt_at_ms = NULL, last_error = $1, last_activity_ms = $2
             WHERE id = $3",
        )
        .bind(reason.clone())
        .bind(now as i64)
        .bind(job_id.as_str().to_string())
        .execute(&mut *tx)
        .await
        .map_err(StoreError::query("orphan update"))?;

        self.apply_transition_tx(&mut tx, &mut job, JobStatus::Queued, &reason, now).await?;
        tx.commit().await.map_err(StoreError::query("orphan commit"))?;
        Ok(true)
    }

    /// User cancel. Idempotent for already-cancelled jobs; other terminal
    /// states refuse.
    pub async fn cancel_job(
        &self,
        job_id: &JobId,
        tenant_id: Option<&TenantId>,
    ) -> Result<bool, StoreError> {
        let now = self.now_ms();
        let mut tx = self.pool.begin().await.map_err(StoreError::query("cancel begin"))?;

        let mut job = self.fetch_job_tx(&mut tx, job_id).await?;
        if let Some(tenant) = tenant_id {
            if &job.tenant_id != tenant {
                return Err(StoreError::not_found("job", job_id.as_str()));
            }
        }
        match transition_verdict(job.status, JobStatus::Cancelled)? {
            TransitionVerdict::Unchanged => return Ok(false),
            TransitionVerdict::Apply => {}
        }

        // The worker is freed now; the cancel reaches it on its next
        // heartbeat (worker_id stays on the row for that lookup).
        if job.status.is_on_worker() {
            if let Some(worker_id) = job.worker_id {
                self.free_worker_tx(&mut tx, &worker_id, job_id).await?;
            }
        }
        sqlx::query("UPDATE jobs SET completed_at_ms = $1, last_activity_ms = $1 WHERE id = $2")
            .bind(now as i64)
            .bind(job_id.as_str().to_string())
            .execute(&mut *tx)
            .await
            .map_err(StoreError::query("cancel update"))?;

        self.apply_transition_tx(&mut tx, &mut job, JobStatus::Cancelled, "cancelled by user", now)
            .await?;
        tx.commit().await.map_err(StoreError::query("cancel commit"))?;
        Ok(true)
    }

    /// Touch `last_activity` for an in-flight job. Jobs in any other state
    /// are silently skipped so late heartbeats are harmless.
    pub async fn update_job_heartbeat(&self, job_id: &JobId) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE jobs SET last_activity_ms = $1
             WHERE id = $2 AND status IN ('assigned','running')",
        )
        .bind(self.now_ms() as i64)
        .bind(job_id.as_str().to_string())
        .execute(&self.pool)
        .await
        .map_err(StoreError::query("job heartbeat"))?;
        Ok(())
    }

    pub async fn get_jobs_in_state(&self, state: JobStatus) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query("SELECT * FROM jobs WHERE status = $1 ORDER BY seq")
            .bind(state.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::query("jobs in state"))?;
        rows.iter().map(job_from_row).collect()
    }

    /// Queued work in dispatch order: queue class, then priority, then
    /// sequence (FIFO within equal rank).
    pub async fn get_queued_jobs(&self, limit: i64) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM jobs WHERE status = 'queued'
             ORDER BY queue_rank, priority_rank, seq LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::query("queued jobs"))?;
        rows.iter().map(job_from_row).collect()
    }

    /// First queued job this worker could run, in dispatch order.
    pub async fn get_next_eligible_job(
        &self,
        worker: &WorkerNode,
    ) -> Result<Option<Job>, StoreError> {
        for job in self.get_queued_jobs(100).await? {
            let tenant_ok = job.tenant_id == worker.tenant_id || worker.tenant_id.is_default();
            if tenant_ok && worker.can_run(job.requires_gpu()) {
                return Ok(Some(job));
            }
        }
        Ok(None)
    }

    /// RETRYING jobs whose backoff has elapsed.
    pub async fn get_due_retries(&self) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM jobs WHERE status = 'retrying'
             AND next_attempt_at_ms IS NOT NULL AND next_attempt_at_ms <= $1
             ORDER BY seq",
        )
        .bind(self.now_ms() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::query("due retries"))?;
        rows.iter().map(job_from_row).collect()
    }

    /// Jobs bound to a worker the reconciler has declared offline.
    pub async fn get_orphaned_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(
            "SELECT j.* FROM jobs j JOIN workers w ON j.worker_id = w.id
             WHERE j.status IN ('assigned','running') AND w.status = 'offline'
             ORDER BY j.seq",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::query("orphaned jobs"))?;
        rows.iter().map(job_from_row).collect()
    }

    /// In-flight jobs with no activity since `cutoff_ms`.
    pub async fn get_stale_jobs(&self, cutoff_ms: u64) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM jobs WHERE status IN ('assigned','running')
             AND last_activity_ms < $1 ORDER BY seq",
        )
        .bind(cutoff_ms as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::query("stale jobs"))?;
        rows.iter().map(job_from_row).collect()
    }

    /// RUNNING jobs whose effective deadline has passed. The deadline
    /// depends on scenario defaults, so the filter runs on the (small)
    /// RUNNING set rather than in SQL.
    pub async fn get_timed_out_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let now = self.now_ms();
        Ok(self
            .get_jobs_in_state(JobStatus::Running)
            .await?
            .into_iter()
            .filter(|job| job.deadline_ms() <= now)
            .collect())
    }

    /// Cancelled jobs this worker must tear down, surfaced on heartbeats.
    pub async fn cancelled_jobs_for_worker(
        &self,
        worker_id: &WorkerId,
    ) -> Result<Vec<JobId>, StoreError> {
        let cutoff = self.now_ms().saturating_sub(CANCEL_NOTIFY_WINDOW_MS);
        let rows = sqlx::query(
            "SELECT id FROM jobs WHERE worker_id = $1 AND status = 'cancelled'
             AND completed_at_ms >= $2",
        )
        .bind(worker_id.as_str().to_string())
        .bind(cutoff as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::query("cancelled for worker"))?;
        rows.iter()
            .map(|row| {
                sqlx::Row::try_get::<String, _>(row, "id")
                    .map(JobId::from_string)
                    .map_err(StoreError::query("cancelled for worker"))
            })
            .collect()
    }

    /// Tenant-scoped listing with optional filters.
    pub async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, StoreError> {
        let mut sql = String::from("SELECT * FROM jobs WHERE 1 = 1");
        let mut binds: Vec<String> = Vec::new();
        if let Some(tenant) = &filter.tenant_id {
            binds.push(tenant.as_str().to_string());
            sql.push_str(&format!(" AND tenant_id = ${}", binds.len()));
        }
        if let Some(status) = filter.status {
            binds.push(status.as_str().to_string());
            sql.push_str(&format!(" AND status = ${}", binds.len()));
        }
        if let Some(queue) = filter.queue {
            binds.push(queue.as_str().to_string());
            sql.push_str(&format!(" AND queue = ${}", binds.len()));
        }
        if let Some(priority) = filter.priority {
            binds.push(priority.as_str().to_string());
            sql.push_str(&format!(" AND priority = ${}", binds.len()));
        }
        sql.push_str(&format!(
            " ORDER BY seq DESC LIMIT {}",
            filter.limit.unwrap_or(200).clamp(1, 1000)
        ));

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind.clone());
        }
        let rows =
            query.fetch_all(&self.pool).await.map_err(StoreError::query("list_jobs"))?;
        rows.iter().map(job_from_row).collect()
    }

    /// Retention sweep: delete terminal jobs older than `cutoff_ms`,
    /// bounded per run.
    pub async fn delete_terminal_jobs_before(
        &self,
        cutoff_ms: u64,
        limit: i64,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM jobs WHERE id IN (
                SELECT id FROM jobs
                WHERE status IN ('completed','failed','cancelled')
                AND completed_at_ms IS NOT NULL AND completed_at_ms < $1
                ORDER BY completed_at_ms LIMIT $2
            )",
        )
        .bind(cutoff_ms as i64)
        .bind(limit)
        .execute(&self.pool)
        .await
        .map_err(StoreError::query("retention delete"))?;
        Ok(result.rows_affected())
    }

    // ---- transaction-scoped helpers ----

    pub(crate) async fn fetch_job_tx(
        &self,
        tx: &mut Transaction<'_, Any>,
        id: &JobId,
    ) -> Result<Job, StoreError> {
        let sql = format!("SELECT * FROM jobs WHERE id = $1{}", self.lock_clause());
        let row = sqlx::query(&sql)
            .bind(id.as_str().to_string())
            .fetch_optional(&mut **tx)
            .await
            .map_err(StoreError::query("fetch job"))?
            .ok_or_else(|| StoreError::not_found("job", id.as_str()))?;
        job_from_row(&row)
    }

    /// Append the audit record and flip the status column, in one UPDATE.
    async fn apply_transition_tx(
        &self,
        tx: &mut Transaction<'_, Any>,
        job: &mut Job,
        to: JobStatus,
        reason: &str,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        job.push_transition(to, reason, now_ms);
        sqlx::query("UPDATE jobs SET status = $1, state_transitions = $2 WHERE id = $3")
            .bind(to.as_str())
            .bind(to_json(&job.transitions, "state_transitions")?)
            .bind(job.id.as_str().to_string())
            .execute(&mut **tx)
            .await
            .map_err(StoreError::query("apply transition"))?;
        tracing::debug!(job_id = %job.id, to = %to, reason, "job transitioned");
        Ok(())
    }

    /// Release a worker, guarded on `current_job` so a stale release never
    /// clobbers a newer assignment.
    pub(crate) async fn free_worker_tx(
        &self,
        tx: &mut Transaction<'_, Any>,
        worker_id: &WorkerId,
        job_id: &JobId,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE workers SET status = 'available', current_job = NULL
             WHERE id = $1 AND current_job = $2 AND status = 'busy'",
        )
        .bind(worker_id.as_str().to_string())
        .bind(job_id.as_str().to_string())
        .execute(&mut **tx)
        .await
        .map_err(StoreError::query("free worker"))?;
        // Draining workers finish their last job and leave the pool.
        sqlx::query(
            "DELETE FROM workers WHERE id = $1 AND status = 'draining' AND current_job = $2",
        )
        .bind(worker_id.as_str().to_string())
        .bind(job_id.as_str().to_string())
        .execute(&mut **tx)
        .await
        .map_err(StoreError::query("drain worker"))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
