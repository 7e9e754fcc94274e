// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unauthenticated system endpoints: liveness, readiness, metrics.

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use recode_core::clock::Clock;

/// `GET /health`: the process is alive.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /ready`: the store answers.
pub async fn ready<C: Clock>(State(state): State<AppState<C>>) -> Response {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "ready" }))).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "readiness probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "unavailable", "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// `GET /metrics`: Prometheus text format. Store aggregates refresh at
/// scrape time through the single GROUP BY queries.
pub async fn metrics<C: Clock>(State(state): State<AppState<C>>) -> Response {
    let jobs = match state.store.get_job_metrics().await {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::error!(error = %e, "job metrics query failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let workers = match state.store.get_worker_metrics().await {
        Ok(workers) => workers,
        Err(e) => {
            tracing::error!(error = %e, "worker metrics query failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    state.metrics.set_aggregates(&jobs, &workers);

    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
        .into_response()
}
