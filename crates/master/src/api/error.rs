// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store-error to HTTP-status translation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use recode_store::StoreError;
use recode_wire::ErrorBody;

/// Wrapper so handlers can `?` store calls straight into responses.
pub struct ApiError(pub StoreError);

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self(e)
    }
}

pub fn status_for(error: &StoreError) -> StatusCode {
    match error {
        StoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::InvalidTransition(_) | StoreError::Conflict(_) => StatusCode::CONFLICT,
        StoreError::TenantInactive(_) => StatusCode::FORBIDDEN,
        StoreError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        StoreError::Query { .. } | StoreError::Column { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, status = %status, "request rejected");
        }
        (status, Json(ErrorBody::new(self.0.to_string()))).into_response()
    }
}

/// 401 with the standard envelope.
pub fn unauthenticated() -> Response {
    (StatusCode::UNAUTHORIZED, Json(ErrorBody::new("invalid or missing API key")))
        .into_response()
}

/// 403 with the standard envelope.
pub fn forbidden(message: &str) -> Response {
    (StatusCode::FORBIDDEN, Json(ErrorBody::new(message))).into_response()
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
