// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker registration, heartbeats, and liveness bookkeeping.

use crate::error::StoreError;
use crate::rows::{to_json, worker_from_row};
use crate::Store;
use recode_core::clock::Clock;
use recode_core::tenant::TenantId;
use recode_core::worker::{WorkerCapabilities, WorkerId, WorkerNode, WorkerStatus};
use sqlx::{Any, Transaction};

impl<C: Clock> Store<C> {
    /// Register a new worker under a tenant, subject to the tenant's worker
    /// quota. Offline rows do not count against the quota.
    pub async fn register_worker(
        &self,
        tenant_id: &TenantId,
        address: &str,
        capabilities: WorkerCapabilities,
    ) -> Result<WorkerNode, StoreError> {
        let now = self.now_ms();
        let mut tx = self.pool.begin().await.map_err(StoreError::query("register begin"))?;

        let tenant = self.fetch_tenant_tx(&mut tx, tenant_id.as_str()).await?;
        if !tenant.admits(now) {
            return Err(StoreError::TenantInactive(tenant.id.to_string()));
        }
        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM workers WHERE tenant_id = $1 AND status != 'offline'",
        )
        .bind(tenant.id.as_str().to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::query("register count"))?;
        if !tenant.quota.admits_worker(active) {
            return Err(StoreError::QuotaExceeded {
                tenant: tenant.id.to_string(),
                what: "workers",
            });
        }

        let node = WorkerNode {
            id: WorkerId::generate(),
            tenant_id: tenant.id,
            address: address.to_string(),
            capabilities,
            status: WorkerStatus::Available,
            current_job: None,
            last_heartbeat_ms: now,
            registered_at_ms: now,
        };
        sqlx::query(
            "INSERT INTO workers (id, tenant_id, address, capabilities, status,
                current_job, last_heartbeat_ms, registered_at_ms)
             VALUES ($1, $2, $3, $4, $5, NULL, $6, $7)",
        )
        .bind(node.id.as_str().to_string())
        .bind(node.tenant_id.as_str().to_string())
        .bind(node.address.clone())
        .bind(to_json(&node.capabilities, "capabilities")?)
        .bind(node.status.as_str())
        .bind(now as i64)
        .bind(now as i64)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::query("register insert"))?;
        tx.commit().await.map_err(StoreError::query("register commit"))?;

        tracing::info!(
            worker_id = %node.id,
            tenant = %node.tenant_id,
            address = %node.address,
            cpu_threads = node.capabilities.cpu_threads,
            has_gpu = node.capabilities.has_gpu,
            "worker registered"
        );
        Ok(node)
    }

    pub async fn get_worker(&self, id: &WorkerId) -> Result<WorkerNode, StoreError> {
        let row = sqlx::query("SELECT * FROM workers WHERE id = $1")
            .bind(id.as_str().to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::query("get_worker"))?
            .ok_or_else(|| StoreError::not_found("worker", id.as_str()))?;
        worker_from_row(&row)
    }

    pub async fn list_workers(
        &self,
        tenant_id: Option<&TenantId>,
    ) -> Result<Vec<WorkerNode>, StoreError> {
        let rows = match tenant_id {
            Some(tenant) => {
                sqlx::query("SELECT * FROM workers WHERE tenant_id = $1 ORDER BY registered_at_ms")
                    .bind(tenant.as_str().to_string())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT * FROM workers ORDER BY registered_at_ms")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(StoreError::query("list_workers"))?;
        rows.iter().map(worker_from_row).collect()
    }

    /// Workers the scheduler may bind jobs to.
    pub async fn get_available_workers(&self) -> Result<Vec<WorkerNode>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM workers WHERE status = 'available' ORDER BY registered_at_ms",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::query("available workers"))?;
        rows.iter().map(worker_from_row).collect()
    }

    /// Record a heartbeat. Returns the cancelled jobs the worker must tear
    /// down. A worker that was declared offline and reports again rejoins
    /// as available; its old job has been re-queued, and any late result it
    /// sends is discarded by the assignee check.
    pub async fn heartbeat_worker(
        &self,
        id: &WorkerId,
        reported_job: Option<&recode_core::job::JobId>,
    ) -> Result<Vec<recode_core::job::JobId>, StoreError> {
        let now = self.now_ms();
        let mut tx = self.pool.begin().await.map_err(StoreError::query("heartbeat begin"))?;

        let worker = self.fetch_worker_tx(&mut tx, id).await?;
        match worker.status {
            WorkerStatus::Offline => {
                tracing::info!(worker_id = %id, "offline worker resumed heartbeating");
                sqlx::query(
                    "UPDATE workers SET status = 'available', current_job = NULL,
                        last_heartbeat_ms = $1 WHERE id = $2",
                )
                .bind(now as i64)
                .bind(id.as_str().to_string())
                .execute(&mut *tx)
                .await
                .map_err(StoreError::query("heartbeat revive"))?;
            }
            _ => {
                sqlx::query("UPDATE workers SET last_heartbeat_ms = $1 WHERE id = $2")
                    .bind(now as i64)
                    .bind(id.as_str().to_string())
                    .execute(&mut *tx)
                    .await
                    .map_err(StoreError::query("heartbeat update"))?;
            }
        }
        tx.commit().await.map_err(StoreError::query("heartbeat commit"))?;

        // Keep the job's liveness clock in step with its worker's.
        if let Some(job_id) = reported_job {
            self.update_job_heartbeat(job_id).await?;
        }

        self.cancelled_jobs_for_worker(id).await
    }

    /// Declare every silent worker offline and detach its current job
    /// pointer. Returns the affected workers; the caller re-queues their
    /// orphans.
    pub async fn mark_dead_workers(
        &self,
        heartbeat_cutoff_ms: u64,
    ) -> Result<Vec<WorkerNode>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM workers WHERE status != 'offline' AND last_heartbeat_ms < $1",
        )
        .bind(heartbeat_cutoff_ms as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::query("dead workers select"))?;
        let dead: Vec<WorkerNode> =
            rows.iter().map(worker_from_row).collect::<Result<_, _>>()?;

        for worker in &dead {
            sqlx::query(
                "UPDATE workers SET status = 'offline', current_job = NULL
                 WHERE id = $1 AND last_heartbeat_ms < $2",
            )
            .bind(worker.id.as_str().to_string())
            .bind(heartbeat_cutoff_ms as i64)
            .execute(&self.pool)
            .await
            .map_err(StoreError::query("dead workers update"))?;
            tracing::warn!(
                worker_id = %worker.id,
                last_heartbeat_ms = worker.last_heartbeat_ms,
                "worker marked offline (missed heartbeats)"
            );
        }
        Ok(dead)
    }

    /// Explicit deregistration. A busy worker drains: it finishes its
    /// current job and its row is removed when that job releases it.
    pub async fn deregister_worker(&self, id: &WorkerId) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::query("deregister begin"))?;
        let worker = self.fetch_worker_tx(&mut tx, id).await?;

        let drained = match worker.current_job {
            Some(_) => {
                sqlx::query("UPDATE workers SET status = 'draining' WHERE id = $1")
                    .bind(id.as_str().to_string())
                    .execute(&mut *tx)
                    .await
                    .map_err(StoreError::query("deregister drain"))?;
                false
            }
            None => {
                sqlx::query("DELETE FROM workers WHERE id = $1")
                    .bind(id.as_str().to_string())
                    .execute(&mut *tx)
                    .await
                    .map_err(StoreError::query("deregister delete"))?;
                true
            }
        };
        tx.commit().await.map_err(StoreError::query("deregister commit"))?;
        tracing::info!(worker_id = %id, removed = drained, "worker deregistered");
        Ok(drained)
    }

    pub(crate) async fn fetch_worker_tx(
        &self,
        tx: &mut Transaction<'_, Any>,
        id: &WorkerId,
    ) -> Result<WorkerNode, StoreError> {
        let sql = format!("SELECT * FROM workers WHERE id = $1{}", self.lock_clause());
        let row = sqlx::query(&sql)
            .bind(id.as_str().to_string())
            .fetch_optional(&mut **tx)
            .await
            .map_err(StoreError::query("fetch worker"))?
            .ok_or_else(|| StoreError::not_found("worker", id.as_str()))?;
        worker_from_row(&row)
    }
}

#[cfg(test)]
#[path = "workers_tests.rs"]
mod tests;
