// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job endpoints: submission, listing, polling, cancel, heartbeat.

use crate::api::error::ApiError;
use crate::api::middleware::TenantContext;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use recode_core::clock::Clock;
use recode_core::job::{Job, JobId, JobSpec, JobStatus, Priority, QueueClass};
use recode_core::scenario::Scenario;
use recode_core::worker::WorkerId;
use recode_store::JobFilter;
use recode_wire::request::SubmitJobRequest;
use recode_wire::JobList;
use serde::Deserialize;

/// `POST /jobs`: admission-checked submission.
pub async fn submit<C: Clock>(
    State(state): State<AppState<C>>,
    Extension(tenant): Extension<TenantContext>,
    Json(request): Json<SubmitJobRequest>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let mut parameters = request.parameters;
    if let Some(confidence) = request.confidence {
        parameters.insert("confidence".to_string(), serde_json::json!(confidence));
    }

    let scenario = Scenario::for_name(&request.scenario);
    let unknown = scenario.unknown_params(&parameters);
    if !unknown.is_empty() {
        tracing::warn!(
            scenario = %request.scenario,
            unknown = ?unknown,
            "submission carries undocumented parameters"
        );
    }

    let spec = JobSpec {
        tenant_id: tenant.0.id,
        scenario: request.scenario,
        engine: request.engine.unwrap_or_default(),
        parameters,
        queue: request.queue.unwrap_or_default(),
        priority: request.priority.unwrap_or_default(),
        limits: request.resource_limits.unwrap_or_default(),
    };
    let job = state.store.create_job(spec).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    state: Option<JobStatus>,
    queue: Option<QueueClass>,
    priority: Option<Priority>,
    limit: Option<i64>,
}

/// `GET /jobs`: tenant-scoped listing.
pub async fn list<C: Clock>(
    State(state): State<AppState<C>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<JobListQuery>,
) -> Result<Json<JobList>, ApiError> {
    let filter = JobFilter {
        tenant_id: tenant.filter(),
        status: query.state,
        queue: query.queue,
        priority: query.priority,
        limit: query.limit,
    };
    let jobs = state.store.list_jobs(&filter).await?;
    Ok(Json(JobList { jobs }))
}

#[derive(Debug, Deserialize)]
pub struct NextJobQuery {
    node_id: WorkerId,
}

/// `GET /jobs/next?node_id=…`: worker poll. Hands over the job bound to
/// this worker (flipping it to RUNNING) or 204.
pub async fn next<C: Clock>(
    State(state): State<AppState<C>>,
    Query(query): Query<NextJobQuery>,
) -> Result<Response, ApiError> {
    // Surfaces NotFound for never-registered workers.
    state.store.get_worker(&query.node_id).await?;
    match state.store.claim_next_job(&query.node_id).await? {
        Some(job) => Ok(Json(job).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// `GET /jobs/{id}`
pub async fn get_job<C: Clock>(
    State(state): State<AppState<C>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let job_id = JobId::from_string(&id);
    let job = state.store.get_job(&job_id).await?;
    if let Some(scope) = tenant.filter() {
        if job.tenant_id != scope {
            return Err(recode_store::StoreError::not_found("job", id).into());
        }
    }
    Ok(Json(job))
}

/// `DELETE /jobs/{id}`: user cancel, idempotent.
pub async fn cancel<C: Clock>(
    State(state): State<AppState<C>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let job_id = JobId::from_string(&id);
    let changed = state.store.cancel_job(&job_id, tenant.filter().as_ref()).await?;
    Ok(Json(serde_json::json!({ "cancelled": changed })))
}

/// `POST /jobs/{id}/heartbeat`: per-job liveness from the executing
/// worker. Silently ignores jobs that are no longer in flight.
pub async fn heartbeat<C: Clock>(
    State(state): State<AppState<C>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.update_job_heartbeat(&JobId::from_string(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
