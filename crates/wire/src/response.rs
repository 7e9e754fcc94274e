// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Response bodies produced by the master API.
//!
//! Jobs, workers, and tenants serialize as their core records; this module
//! adds the envelope and aggregate shapes.

use recode_core::job::{Job, JobId, JobStatus};
use recode_core::tenant::{Tenant, TenantQuota};
use recode_core::worker::{WorkerNode, WorkerStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Error envelope for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

/// `POST /nodes/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterNodeResponse {
    pub id: recode_core::worker::WorkerId,
    pub status: WorkerStatus,
}

/// `POST /nodes/{id}/heartbeat`: 204 when empty, otherwise 200 with the
/// jobs the worker must tear down.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeartbeatReply {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cancelled_jobs: Vec<JobId>,
}

impl HeartbeatReply {
    pub fn is_empty(&self) -> bool {
        self.cancelled_jobs.is_empty()
    }
}

/// `GET /jobs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobList {
    pub jobs: Vec<Job>,
}

/// `GET /nodes`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeList {
    pub nodes: Vec<WorkerNode>,
}

/// `GET /tenants`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantList {
    pub tenants: Vec<Tenant>,
}

/// `GET /tenants/{id}/stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantStatsResponse {
    pub tenant_id: recode_core::tenant::TenantId,
    pub jobs_by_state: HashMap<JobStatus, i64>,
    pub active_jobs: i64,
    pub submitted_last_hour: i64,
    pub active_workers: i64,
    pub quota: TenantQuota,
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
