// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant CRUD, admission resolution, and stats.

use crate::error::StoreError;
use crate::rows::{tenant_from_row, to_json};
use crate::Store;
use recode_core::clock::Clock;
use recode_core::job::JobStatus;
use recode_core::tenant::{Tenant, TenantId, TenantQuota, TenantStatus};
use sqlx::{Any, Row, Transaction};
use std::collections::HashMap;

/// Aggregates behind `GET /tenants/{id}/stats`.
#[derive(Debug, Clone)]
pub struct TenantStats {
    pub tenant_id: TenantId,
    pub jobs_by_state: HashMap<JobStatus, i64>,
    pub active_jobs: i64,
    pub submitted_last_hour: i64,
    pub active_workers: i64,
    pub quota: TenantQuota,
}

/// Sparse update applied by `PUT /tenants/{id}`.
#[derive(Debug, Clone, Default)]
pub struct TenantUpdate {
    pub plan: Option<String>,
    pub status: Option<TenantStatus>,
    pub quota: Option<TenantQuota>,
    pub expires_at_ms: Option<u64>,
}

impl<C: Clock> Store<C> {
    /// Seed the reserved `default` tenant. Idempotent across restarts and
    /// across multiple masters sharing the database.
    pub(crate) async fn ensure_default_tenant(&self) -> Result<(), StoreError> {
        let tenant = Tenant::reserved_default(self.now_ms());
        sqlx::query(
            "INSERT INTO tenants (id, name, plan, status, quota, expires_at_ms,
                created_at_ms, deleted_at_ms)
             VALUES ($1, $2, $3, $4, $5, NULL, $6, NULL)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(tenant.id.as_str().to_string())
        .bind(tenant.name.clone())
        .bind(tenant.plan.clone())
        .bind(tenant.status.as_str())
        .bind(to_json(&tenant.quota, "quota")?)
        .bind(tenant.created_at_ms as i64)
        .execute(&self.pool)
        .await
        .map_err(StoreError::query("ensure default tenant"))?;
        Ok(())
    }

    pub async fn create_tenant(
        &self,
        name: &str,
        plan: &str,
        quota: TenantQuota,
        expires_at_ms: Option<u64>,
    ) -> Result<Tenant, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidInput("tenant name must not be empty".into()));
        }
        let now = self.now_ms();
        let mut tx = self.pool.begin().await.map_err(StoreError::query("tenant begin"))?;

        let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenants WHERE name = $1")
            .bind(name.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(StoreError::query("tenant name check"))?;
        if taken > 0 {
            return Err(StoreError::Conflict(format!("tenant name {:?} already exists", name)));
        }

        let tenant = Tenant {
            id: TenantId::generate(),
            name: name.to_string(),
            plan: plan.to_string(),
            status: TenantStatus::Active,
            quota,
            expires_at_ms,
            created_at_ms: now,
            deleted_at_ms: None,
        };
        sqlx::query(
            "INSERT INTO tenants (id, name, plan, status, quota, expires_at_ms,
                created_at_ms, deleted_at_ms)
             VALUES ($1, $2, $3, $4, $5, $6, $7, NULL)",
        )
        .bind(tenant.id.as_str().to_string())
        .bind(tenant.name.clone())
        .bind(tenant.plan.clone())
        .bind(tenant.status.as_str())
        .bind(to_json(&tenant.quota, "quota")?)
        .bind(tenant.expires_at_ms.map(|v| v as i64))
        .bind(tenant.created_at_ms as i64)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::query("tenant insert"))?;
        tx.commit().await.map_err(StoreError::query("tenant commit"))?;

        tracing::info!(tenant_id = %tenant.id, name = %tenant.name, "tenant created");
        Ok(tenant)
    }

    pub async fn get_tenant(&self, id: &TenantId) -> Result<Tenant, StoreError> {
        let row = sqlx::query("SELECT * FROM tenants WHERE id = $1")
            .bind(id.as_str().to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::query("get_tenant"))?
            .ok_or_else(|| StoreError::not_found("tenant", id.as_str()))?;
        tenant_from_row(&row)
    }

    /// Resolve the `X-Tenant-ID` header value: id first, then unique name.
    pub async fn resolve_tenant(&self, reference: &str) -> Result<Tenant, StoreError> {
        let row = sqlx::query("SELECT * FROM tenants WHERE id = $1 OR name = $1")
            .bind(reference.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::query("resolve_tenant"))?
            .ok_or_else(|| StoreError::not_found("tenant", reference))?;
        tenant_from_row(&row)
    }

    pub async fn list_tenants(&self) -> Result<Vec<Tenant>, StoreError> {
        let rows =
            sqlx::query("SELECT * FROM tenants WHERE deleted_at_ms IS NULL ORDER BY created_at_ms")
                .fetch_all(&self.pool)
                .await
                .map_err(StoreError::query("list_tenants"))?;
        rows.iter().map(tenant_from_row).collect()
    }

    /// Sparse update. `reference` is an id or unique name, like every other
    /// tenant lookup; the write always lands on the resolved id.
    pub async fn update_tenant(
        &self,
        reference: &str,
        update: TenantUpdate,
    ) -> Result<Tenant, StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::query("tenant begin"))?;
        let mut tenant = self.fetch_tenant_tx(&mut tx, reference).await?;

        if let Some(plan) = update.plan {
            tenant.plan = plan;
        }
        if let Some(status) = update.status {
            tenant.status = status;
        }
        if let Some(quota) = update.quota {
            tenant.quota = quota;
        }
        if let Some(expires) = update.expires_at_ms {
            tenant.expires_at_ms = Some(expires);
        }

        sqlx::query(
            "UPDATE tenants SET plan = $1, status = $2, quota = $3, expires_at_ms = $4
             WHERE id = $5",
        )
        .bind(tenant.plan.clone())
        .bind(tenant.status.as_str())
        .bind(to_json(&tenant.quota, "quota")?)
        .bind(tenant.expires_at_ms.map(|v| v as i64))
        .bind(tenant.id.as_str().to_string())
        .execute(&mut *tx)
        .await
        .map_err(StoreError::query("tenant update"))?;
        tx.commit().await.map_err(StoreError::query("tenant commit"))?;
        Ok(tenant)
    }

    /// Soft delete. The reserved `default` tenant refuses; rows are kept
    /// for audit and because live jobs may still reference them.
    pub async fn delete_tenant(&self, reference: &str) -> Result<bool, StoreError> {
        let tenant = self.resolve_tenant(reference).await?;
        if tenant.id.is_default() {
            return Err(StoreError::InvalidInput(
                "the default tenant cannot be deleted".into(),
            ));
        }
        let now = self.now_ms();
        let result = sqlx::query(
            "UPDATE tenants SET deleted_at_ms = $1 WHERE id = $2 AND deleted_at_ms IS NULL",
        )
        .bind(now as i64)
        .bind(tenant.id.as_str().to_string())
        .execute(&self.pool)
        .await
        .map_err(StoreError::query("tenant delete"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Flip active tenants whose expiry has passed to `expired`.
    pub async fn expire_tenants(&self) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE tenants SET status = 'expired'
             WHERE status = 'active' AND deleted_at_ms IS NULL
             AND expires_at_ms IS NOT NULL AND expires_at_ms <= $1",
        )
        .bind(self.now_ms() as i64)
        .execute(&self.pool)
        .await
        .map_err(StoreError::query("expire tenants"))?;
        Ok(result.rows_affected())
    }

    pub async fn tenant_stats(&self, reference: &str) -> Result<TenantStats, StoreError> {
        let tenant = self.resolve_tenant(reference).await?;
        let now = self.now_ms();

        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS n FROM jobs WHERE tenant_id = $1 GROUP BY status",
        )
        .bind(tenant.id.as_str().to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::query("tenant stats jobs"))?;

        let mut jobs_by_state = HashMap::new();
        let mut active_jobs = 0i64;
        for row in &rows {
            let status: String = row.try_get("status").map_err(StoreError::query("tenant stats"))?;
            let count: i64 = row.try_get("n").map_err(StoreError::query("tenant stats"))?;
            let status: JobStatus = status.parse().map_err(StoreError::InvalidInput)?;
            if !status.is_terminal() {
                active_jobs += count;
            }
            jobs_by_state.insert(status, count);
        }

        let submitted_last_hour: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM jobs WHERE tenant_id = $1 AND created_at_ms >= $2",
        )
        .bind(tenant.id.as_str().to_string())
        .bind(now.saturating_sub(3_600_000) as i64)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::query("tenant stats hourly"))?;

        let active_workers: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM workers WHERE tenant_id = $1 AND status != 'offline'",
        )
        .bind(tenant.id.as_str().to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::query("tenant stats workers"))?;

        Ok(TenantStats {
            tenant_id: tenant.id,
            jobs_by_state,
            active_jobs,
            submitted_last_hour,
            active_workers,
            quota: tenant.quota,
        })
    }

    pub(crate) async fn fetch_tenant_tx(
        &self,
        tx: &mut Transaction<'_, Any>,
        reference: &str,
    ) -> Result<Tenant, StoreError> {
        let sql = format!(
            "SELECT * FROM tenants WHERE id = $1 OR name = $1{}",
            self.lock_clause()
        );
        let row = sqlx::query(&sql)
            .bind(reference.to_string())
            .fetch_optional(&mut **tx)
            .await
            .map_err(StoreError::query("fetch tenant"))?
            .ok_or_else(|| StoreError::not_found("tenant", reference))?;
        tenant_from_row(&row)
    }
}

#[cfg(test)]
#[path = "tenants_tests.rs"]
mod tests;
