// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! recode-store: the authoritative state store.
//!
//! Jobs, workers, and tenants live in SQLite or PostgreSQL behind one
//! [`Store`] type. Every mutation is a transaction that re-reads the row it
//! is about to change (with a row lock on PostgreSQL), re-checks the FSM,
//! and appends the audit transition in the same atomic unit as the status
//! update. The scheduler and reconciler may freely race; the store is where
//! those races are decided.

pub mod db;
pub mod error;
mod rows;
mod schema;

mod jobs;
mod metrics;
mod tenants;
mod workers;

#[cfg(test)]
mod test_helpers;

pub use db::DbKind;
pub use error::StoreError;
pub use jobs::JobFilter;
pub use metrics::{JobMetrics, WorkerMetrics};
pub use tenants::{TenantStats, TenantUpdate};

use recode_core::clock::{Clock, SystemClock};
use sqlx::AnyPool;

/// Handle to the authoritative store. Cheap to clone; all clones share the
/// underlying pool.
#[derive(Clone)]
pub struct Store<C: Clock = SystemClock> {
    pool: AnyPool,
    kind: DbKind,
    clock: C,
}

impl<C: Clock> Store<C> {
    /// Connect and bootstrap the schema (including the reserved `default`
    /// tenant).
    pub async fn open(kind: DbKind, dsn: &str, clock: C) -> Result<Self, StoreError> {
        let pool = db::connect(kind, dsn).await?;
        let store = Self { pool, kind, clock };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        schema::migrate(&self.pool).await?;
        self.ensure_default_tenant().await?;
        Ok(())
    }

    /// Cheap connectivity probe for the readiness endpoint.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StoreError::query("ping"))?;
        Ok(())
    }

    pub fn kind(&self) -> DbKind {
        self.kind
    }

    /// Current UTC epoch milliseconds from the store's clock. Exposed so
    /// the loops built on top schedule deadlines against the same clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }

    /// `FOR UPDATE` on PostgreSQL; SQLite serializes writers on its own.
    pub(crate) fn lock_clause(&self) -> &'static str {
        match self.kind {
            DbKind::Postgres => " FOR UPDATE",
            DbKind::Sqlite => "",
        }
    }
}
