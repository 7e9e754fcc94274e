// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker (node) endpoints: registration, heartbeat, listing, removal.

use crate::api::error::ApiError;
use crate::api::middleware::TenantContext;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use recode_core::clock::Clock;
use recode_core::worker::{WorkerCapabilities, WorkerId};
use recode_wire::request::{HeartbeatRequest, RegisterNodeRequest};
use recode_wire::{HeartbeatReply, NodeList, RegisterNodeResponse};

/// `POST /nodes/register`
pub async fn register<C: Clock>(
    State(state): State<AppState<C>>,
    Extension(tenant): Extension<TenantContext>,
    Json(request): Json<RegisterNodeRequest>,
) -> Result<(StatusCode, Json<RegisterNodeResponse>), ApiError> {
    let capabilities = WorkerCapabilities {
        cpu_threads: request.cpu_threads,
        cpu_model: request.cpu_model,
        has_gpu: request.has_gpu,
        gpu_type: request.gpu_type,
        ram_bytes: request.ram_bytes,
        machine_class: request.machine_class,
        labels: request.labels,
    };
    let node = state
        .store
        .register_worker(&tenant.0.id, &request.address, capabilities)
        .await?;
    Ok((StatusCode::CREATED, Json(RegisterNodeResponse { id: node.id, status: node.status })))
}

/// `POST /nodes/{id}/heartbeat`: 204 when there is nothing to say,
/// otherwise the cancellation list.
pub async fn heartbeat<C: Clock>(
    State(state): State<AppState<C>>,
    Path(id): Path<String>,
    Json(request): Json<HeartbeatRequest>,
) -> Result<Response, ApiError> {
    let worker_id = WorkerId::from_string(&id);
    if let Some(cpu) = request.cpu_percent {
        state.metrics.record_worker_cpu(worker_id.as_str(), cpu);
    }
    let cancelled = state
        .store
        .heartbeat_worker(&worker_id, request.current_job.as_ref())
        .await?;
    if cancelled.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(HeartbeatReply { cancelled_jobs: cancelled }).into_response())
}

/// `GET /nodes`
pub async fn list<C: Clock>(
    State(state): State<AppState<C>>,
    Extension(tenant): Extension<TenantContext>,
) -> Result<Json<NodeList>, ApiError> {
    let nodes = state.store.list_workers(tenant.filter().as_ref()).await?;
    Ok(Json(NodeList { nodes }))
}

/// `DELETE /nodes/{id}`: explicit deregistration; busy workers drain.
pub async fn deregister<C: Clock>(
    State(state): State<AppState<C>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.deregister_worker(&WorkerId::from_string(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
