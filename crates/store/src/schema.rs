// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema bootstrap.
//!
//! Run at startup; every statement is idempotent so restarts and multiple
//! masters sharing one database are safe. Timestamps are UTC epoch
//! milliseconds (`BIGINT`), JSON columns are `TEXT`, both of which mean the
//! same DDL works on SQLite and PostgreSQL.

use crate::error::StoreError;
use sqlx::AnyPool;

const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS tenants (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        plan TEXT NOT NULL,
        status TEXT NOT NULL,
        quota TEXT NOT NULL,
        expires_at_ms BIGINT,
        created_at_ms BIGINT NOT NULL,
        deleted_at_ms BIGINT
    )",
    "CREATE TABLE IF NOT EXISTS workers (
        id TEXT PRIMARY KEY,
        tenant_id TEXT NOT NULL,
        address TEXT NOT NULL,
        capabilities TEXT NOT NULL,
        status TEXT NOT NULL,
        current_job TEXT,
        last_heartbeat_ms BIGINT NOT NULL,
        registered_at_ms BIGINT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS jobs (
        id TEXT PRIMARY KEY,
        seq BIGINT NOT NULL UNIQUE,
        tenant_id TEXT NOT NULL,
        scenario TEXT NOT NULL,
        engine TEXT NOT NULL,
        parameters TEXT NOT NULL,
        status TEXT NOT NULL,
        queue TEXT NOT NULL,
        queue_rank INTEGER NOT NULL,
        priority TEXT NOT NULL,
        priority_rank INTEGER NOT NULL,
        worker_id TEXT,
        retry_count INTEGER NOT NULL,
        last_error TEXT,
        limits TEXT NOT NULL,
        created_at_ms BIGINT NOT NULL,
        started_at_ms BIGINT,
        last_activity_ms BIGINT NOT NULL,
        completed_at_ms BIGINT,
        next_attempt_at_ms BIGINT,
        state_transitions TEXT NOT NULL
    )",
    // Dispatch order is (class, priority, seq); the ranks are denormalized
    // at insert time so the index serves the scheduler's ORDER BY directly.
    "CREATE INDEX IF NOT EXISTS idx_jobs_dispatch
        ON jobs (status, queue_rank, priority_rank, seq)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_tenant ON jobs (tenant_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_worker ON jobs (worker_id)",
    "CREATE INDEX IF NOT EXISTS idx_workers_status ON workers (status)",
    "CREATE TABLE IF NOT EXISTS sequences (
        name TEXT PRIMARY KEY,
        value BIGINT NOT NULL
    )",
    "INSERT INTO sequences (name, value) VALUES ('jobs', 0)
        ON CONFLICT (name) DO NOTHING",
];

pub(crate) async fn migrate(pool: &AnyPool) -> Result<(), StoreError> {
    for statement in STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(StoreError::query("migrate"))?;
    }
    Ok(())
}
