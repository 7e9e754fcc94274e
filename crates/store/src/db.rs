// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database backend selection and pool construction.
//!
//! Both backends are served through sqlx's `Any` driver: the SQL in this
//! crate sticks to the common subset (`$N` placeholders bind on SQLite and
//! PostgreSQL alike), and the few backend-specific clauses branch on
//! [`DbKind`].

use crate::error::StoreError;
use sqlx::any::{AnyPoolOptions, install_default_drivers};
use sqlx::AnyPool;
use std::str::FromStr;
use std::sync::Once;
use std::time::Duration;

static DRIVERS: Once = Once::new();

/// Which backend `DATABASE_TYPE` selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    Sqlite,
    Postgres,
}

recode_core::simple_display! {
    DbKind {
        Sqlite => "sqlite",
        Postgres => "postgres",
    }
}

impl FromStr for DbKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(DbKind::Sqlite),
            "postgres" | "postgresql" => Ok(DbKind::Postgres),
            other => Err(StoreError::InvalidInput(format!(
                "unsupported DATABASE_TYPE {:?} (expected sqlite or postgres)",
                other
            ))),
        }
    }
}

impl DbKind {
    fn max_connections(self, dsn: &str) -> u32 {
        match self {
            // Every connection to an in-memory SQLite database is its own
            // database; the pool must stay at one connection.
            DbKind::Sqlite if dsn.contains(":memory:") => 1,
            DbKind::Sqlite => 4,
            DbKind::Postgres => 10,
        }
    }
}

/// Build the connection pool for the selected backend.
pub async fn connect(kind: DbKind, dsn: &str) -> Result<AnyPool, StoreError> {
    DRIVERS.call_once(install_default_drivers);

    tracing::info!(backend = %kind, "connecting to store");
    AnyPoolOptions::new()
        .max_connections(kind.max_connections(dsn))
        .acquire_timeout(Duration::from_secs(10))
        .connect(dsn)
        .await
        .map_err(StoreError::query("connect"))
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
