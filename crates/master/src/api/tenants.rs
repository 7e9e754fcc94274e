// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant management endpoints.
//!
//! Create/update/delete and the full listing are operator actions,
//! restricted to the default-tenant context. A tenant may read its own
//! record and stats. Path segments accept a tenant id or its unique name,
//! matching the `X-Tenant-ID` header semantics.

use crate::api::error::{forbidden, ApiError};
use crate::api::middleware::TenantContext;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use recode_core::clock::Clock;
use recode_store::TenantUpdate;
use recode_wire::request::{TenantCreateRequest, TenantUpdateRequest};
use recode_wire::{TenantList, TenantStatsResponse};

/// `POST /tenants` (operator only)
pub async fn create<C: Clock>(
    State(state): State<AppState<C>>,
    Extension(tenant): Extension<TenantContext>,
    Json(request): Json<TenantCreateRequest>,
) -> Result<Response, ApiError> {
    if !tenant.is_admin() {
        return Ok(forbidden("tenant management requires the operator context"));
    }
    let created = state
        .store
        .create_tenant(
            &request.name,
            request.plan.as_deref().unwrap_or("standard"),
            request.quota.unwrap_or_default(),
            request.expires_at_ms,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// `GET /tenants` (operator only)
pub async fn list<C: Clock>(
    State(state): State<AppState<C>>,
    Extension(tenant): Extension<TenantContext>,
) -> Result<Response, ApiError> {
    if !tenant.is_admin() {
        return Ok(forbidden("tenant management requires the operator context"));
    }
    let tenants = state.store.list_tenants().await?;
    Ok(Json(TenantList { tenants }).into_response())
}

/// `GET /tenants/{id}`: operator, or the tenant itself.
pub async fn get_tenant<C: Clock>(
    State(state): State<AppState<C>>,
    Extension(tenant): Extension<TenantContext>,
    Path(reference): Path<String>,
) -> Result<Response, ApiError> {
    let record = state.store.resolve_tenant(&reference).await?;
    if !tenant.is_admin() && tenant.0.id != record.id {
        return Ok(forbidden("not your tenant"));
    }
    Ok(Json(record).into_response())
}

/// `PUT /tenants/{id}` (operator only)
pub async fn update<C: Clock>(
    State(state): State<AppState<C>>,
    Extension(tenant): Extension<TenantContext>,
    Path(reference): Path<String>,
    Json(request): Json<TenantUpdateRequest>,
) -> Result<Response, ApiError> {
    if !tenant.is_admin() {
        return Ok(forbidden("tenant management requires the operator context"));
    }
    let updated = state
        .store
        .update_tenant(
            &reference,
            TenantUpdate {
                plan: request.plan,
                status: request.status,
                quota: request.quota,
                expires_at_ms: request.expires_at_ms,
            },
        )
        .await?;
    Ok(Json(updated).into_response())
}

/// `DELETE /tenants/{id}` (operator only): soft delete.
pub async fn remove<C: Clock>(
    State(state): State<AppState<C>>,
    Extension(tenant): Extension<TenantContext>,
    Path(reference): Path<String>,
) -> Result<Response, ApiError> {
    if !tenant.is_admin() {
        return Ok(forbidden("tenant management requires the operator context"));
    }
    state.store.delete_tenant(&reference).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// `GET /tenants/{id}/stats`: operator, or the tenant itself.
pub async fn stats<C: Clock>(
    State(state): State<AppState<C>>,
    Extension(tenant): Extension<TenantContext>,
    Path(reference): Path<String>,
) -> Result<Response, ApiError> {
    let stats = state.store.tenant_stats(&reference).await?;
    if !tenant.is_admin() && tenant.0.id != stats.tenant_id {
        return Ok(forbidden("not your tenant"));
    }
    Ok(Json(TenantStatsResponse {
        tenant_id: stats.tenant_id,
        jobs_by_state: stats.jobs_by_state,
        active_jobs: stats.active_jobs,
        submitted_last_hour: stats.submitted_last_hour,
        active_workers: stats.active_workers,
        quota: stats.quota,
    })
    .into_response())
}
