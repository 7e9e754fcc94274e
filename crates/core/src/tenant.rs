// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant records and quotas.
//!
//! Tenants are the isolation boundary: every job and worker belongs to
//! exactly one, and admission checks the owning tenant's quota before any
//! row is written. The reserved `default` tenant always exists and cannot
//! be deleted.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a tenant.
    pub struct TenantId("tnt-");
}

/// Id of the reserved tenant that always exists.
pub const DEFAULT_TENANT: &str = "default";

impl TenantId {
    pub fn default_tenant() -> Self {
        Self::from_string(DEFAULT_TENANT)
    }

    pub fn is_default(&self) -> bool {
        self.as_str() == DEFAULT_TENANT
    }
}

/// Admission status of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Suspended,
    Expired,
}

impl TenantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Suspended => "suspended",
            TenantStatus::Expired => "expired",
        }
    }
}

crate::simple_display! {
    TenantStatus {
        Active => "active",
        Suspended => "suspended",
        Expired => "expired",
    }
}

crate::simple_from_str! {
    TenantStatus {
        "active" => Active,
        "suspended" => Suspended,
        "expired" => Expired,
    }
}

/// Per-tenant admission ceilings. Zero means "unlimited" so the reserved
/// default tenant can stay unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantQuota {
    #[serde(default)]
    pub max_active_jobs: i64,
    #[serde(default)]
    pub max_workers: i64,
    #[serde(default)]
    pub max_cpu_cores: i64,
    #[serde(default)]
    pub max_gpus: i64,
    #[serde(default)]
    pub max_jobs_per_hour: i64,
}

impl TenantQuota {
    /// True when `used` active jobs leave room for one more.
    pub fn admits_job(&self, used: i64) -> bool {
        self.max_active_jobs <= 0 || used < self.max_active_jobs
    }

    /// True when `submitted_last_hour` leaves room for one more.
    pub fn admits_submission(&self, submitted_last_hour: i64) -> bool {
        self.max_jobs_per_hour <= 0 || submitted_last_hour < self.max_jobs_per_hour
    }

    /// True when `used` registered workers leave room for one more.
    pub fn admits_worker(&self, used: i64) -> bool {
        self.max_workers <= 0 || used < self.max_workers
    }
}

/// An isolation unit. Soft-deleted only; rows owning live jobs are never
/// removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    /// Unique human-readable name.
    pub name: String,
    pub plan: String,
    pub status: TenantStatus,
    pub quota: TenantQuota,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at_ms: Option<u64>,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at_ms: Option<u64>,
}

impl Tenant {
    /// The reserved tenant: unlimited quota, never expires.
    pub fn reserved_default(epoch_ms: u64) -> Self {
        Self {
            id: TenantId::default_tenant(),
            name: DEFAULT_TENANT.to_string(),
            plan: "unlimited".to_string(),
            status: TenantStatus::Active,
            quota: TenantQuota::default(),
            expires_at_ms: None,
            created_at_ms: epoch_ms,
            deleted_at_ms: None,
        }
    }

    /// Whether admission accepts work for this tenant right now.
    pub fn admits(&self, now_ms: u64) -> bool {
        if self.deleted_at_ms.is_some() {
            return false;
        }
        match self.status {
            TenantStatus::Active => {
                self.expires_at_ms.map(|exp| now_ms < exp).unwrap_or(true)
            }
            TenantStatus::Suspended | TenantStatus::Expired => false,
        }
    }
}

crate::builder! {
    pub struct TenantBuilder => Tenant {
        into {
            id: TenantId = "tnt-test",
            name: String = "test-tenant",
            plan: String = "standard",
        }
        set {
            status: TenantStatus = TenantStatus::Active,
            quota: TenantQuota = TenantQuota::default(),
            created_at_ms: u64 = 1_000_000,
        }
        option {
            expires_at_ms: u64 = None,
            deleted_at_ms: u64 = None,
        }
    }
}

#[cfg(test)]
#[path = "tenant_tests.rs"]
mod tests;
