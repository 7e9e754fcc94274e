// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed store errors, wrapped with the command that produced them.

use recode_core::fsm::InvalidTransition;
use thiserror::Error;

/// Errors surfaced by store operations. The master API maps these onto HTTP
/// statuses; nothing here is retried inside the store itself.
#[derive(Debug, Error)]
pub enum StoreError {
    /// FSM rejection. Logged and surfaced, never retried.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// Precondition raced away, e.g. the worker was taken by a concurrent
    /// assignment.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("tenant {0} is not active")]
    TenantInactive(String),

    #[error("quota exceeded for tenant {tenant}: {what}")]
    QuotaExceeded { tenant: String, what: &'static str },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{command} query failed: {source}")]
    Query {
        command: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("column {column} did not deserialize: {source}")]
    Column {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    /// Adapter for `map_err` on sqlx calls, tagging the failing command.
    pub fn query(command: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Query { command, source }
    }

    pub(crate) fn column(column: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| Self::Column { column, source }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
