// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result uploads from workers.

use crate::api::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use recode_core::clock::Clock;
use recode_wire::request::{ResultStatus, SubmitResultRequest};

/// `POST /results`: idempotent per `(job_id, node_id)`: only the current
/// assignee's first report changes anything; repeats and stale reports
/// come back with `changed: false`.
pub async fn submit<C: Clock>(
    State(state): State<AppState<C>>,
    Json(request): Json<SubmitResultRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some(logs) = &request.logs {
        tracing::debug!(
            job_id = %request.job_id,
            node_id = %request.node_id,
            log_bytes = logs.len(),
            "result carries tool logs"
        );
    }

    let changed = match request.status {
        ResultStatus::Completed => {
            state.store.complete_job(&request.job_id, &request.node_id).await?
        }
        ResultStatus::Failed => {
            let error = request.error.as_deref().unwrap_or("unknown error");
            let disposition = state
                .retry
                .handle_failure_report(&state.store, &request.job_id, &request.node_id, error)
                .await?;
            disposition != crate::retry::FailureDisposition::Ignored
        }
    };
    Ok(Json(serde_json::json!({ "changed": changed })))
}
