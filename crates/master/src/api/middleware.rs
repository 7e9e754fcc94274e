// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request middleware: metrics tracking, authentication, tenant context.

use crate::api::error::{forbidden, unauthenticated};
use crate::state::AppState;
use axum::extract::{MatchedPath, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use recode_core::clock::Clock;
use recode_core::tenant::{Tenant, DEFAULT_TENANT};
use std::time::Instant;

/// Header carrying the caller's tenant; absent means `default`.
pub const TENANT_HEADER: &str = "X-Tenant-ID";

/// Count every request/response with `{method, endpoint, status}` labels
/// and observe latency. Endpoint is the matched route pattern, not the raw
/// path, to keep label cardinality bounded.
pub async fn track_requests<C: Clock>(
    State(state): State<AppState<C>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let request_bytes = content_length(request.headers());
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    let labels = [method.as_str(), endpoint.as_str(), status.as_str()];
    state.metrics.http_requests.with_label_values(&labels).inc();
    state.metrics.http_request_bytes.with_label_values(&labels).inc_by(request_bytes);
    state
        .metrics
        .http_response_bytes
        .with_label_values(&labels)
        .inc_by(content_length(response.headers()));
    state
        .metrics
        .http_duration_seconds
        .with_label_values(&[method.as_str(), endpoint.as_str()])
        .observe(started.elapsed().as_secs_f64());

    response
}

fn content_length(headers: &axum::http::HeaderMap) -> u64 {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Bearer-key authentication against the configured secret.
pub async fn authenticate<C: Clock>(
    State(state): State<AppState<C>>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned);
    match presented {
        Some(key) if state.api_key_matches(&key) => next.run(request).await,
        _ => unauthenticated(),
    }
}

/// Resolve `X-Tenant-ID` (id or unique name, default `default`), refuse
/// inactive tenants, and hand the record to the handler via extensions.
pub async fn resolve_tenant<C: Clock>(
    State(state): State<AppState<C>>,
    mut request: Request,
    next: Next,
) -> Response {
    let reference = request
        .headers()
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_TENANT)
        .to_string();

    let tenant = match state.store.resolve_tenant(&reference).await {
        Ok(tenant) => tenant,
        Err(e) => return crate::api::error::ApiError(e).into_response(),
    };
    if !tenant.admits(state.store.now_ms()) {
        return forbidden(&format!("tenant {} is not active", tenant.name));
    }

    request.extensions_mut().insert(TenantContext(tenant));
    next.run(request).await
}

/// The resolved tenant for this request.
#[derive(Debug, Clone)]
pub struct TenantContext(pub Tenant);

impl TenantContext {
    /// The default tenant doubles as the operator scope: it sees every
    /// tenant's resources instead of only its own.
    pub fn is_admin(&self) -> bool {
        self.0.id.is_default()
    }

    /// Tenant filter for list queries: `None` widens to all tenants.
    pub fn filter(&self) -> Option<recode_core::tenant::TenantId> {
        if self.is_admin() {
            None
        } else {
            Some(self.0.id)
        }
    }
}

#[cfg(test)]
#[path = "middleware_tests.rs"]
mod tests;
