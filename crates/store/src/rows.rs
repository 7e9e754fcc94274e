// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row-to-domain mapping for the `Any` driver.
//!
//! The `Any` driver only speaks `i64`/`String`/`Option`, so enums come back
//! as their wire strings and JSON columns as text; everything funnels
//! through these helpers.

use crate::error::StoreError;
use recode_core::job::{
    EngineHint, Job, JobId, JobParams, JobStatus, Priority, QueueClass, ResourceLimits,
    StateTransition,
};
use recode_core::tenant::{Tenant, TenantId, TenantQuota, TenantStatus};
use recode_core::worker::{WorkerCapabilities, WorkerId, WorkerNode, WorkerStatus};
use sqlx::any::AnyRow;
use sqlx::Row;
use std::str::FromStr;

fn get_str(row: &AnyRow, column: &'static str) -> Result<String, StoreError> {
    row.try_get::<String, _>(column).map_err(StoreError::query("row read"))
}

fn get_opt_str(row: &AnyRow, column: &'static str) -> Result<Option<String>, StoreError> {
    row.try_get::<Option<String>, _>(column).map_err(StoreError::query("row read"))
}

fn get_i64(row: &AnyRow, column: &'static str) -> Result<i64, StoreError> {
    row.try_get::<i64, _>(column).map_err(StoreError::query("row read"))
}

fn get_ms(row: &AnyRow, column: &'static str) -> Result<u64, StoreError> {
    Ok(get_i64(row, column)?.max(0) as u64)
}

fn get_opt_ms(row: &AnyRow, column: &'static str) -> Result<Option<u64>, StoreError> {
    let value =
        row.try_get::<Option<i64>, _>(column).map_err(StoreError::query("row read"))?;
    Ok(value.map(|v| v.max(0) as u64))
}

fn parse_enum<T: FromStr<Err = String>>(
    raw: &str,
    column: &'static str,
) -> Result<T, StoreError> {
    raw.parse::<T>().map_err(|_| {
        StoreError::InvalidInput(format!("column {} holds unknown value {:?}", column, raw))
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(
    raw: &str,
    column: &'static str,
) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(StoreError::column(column))
}

pub(crate) fn job_from_row(row: &AnyRow) -> Result<Job, StoreError> {
    let status: JobStatus = parse_enum(&get_str(row, "status")?, "status")?;
    let queue: QueueClass = parse_enum(&get_str(row, "queue")?, "queue")?;
    let priority: Priority = parse_enum(&get_str(row, "priority")?, "priority")?;
    let engine: EngineHint = parse_enum(&get_str(row, "engine")?, "engine")?;

    let parameters: JobParams = parse_json(&get_str(row, "parameters")?, "parameters")?;
    let limits: ResourceLimits = parse_json(&get_str(row, "limits")?, "limits")?;
    let transitions: Vec<StateTransition> =
        parse_json(&get_str(row, "state_transitions")?, "state_transitions")?;

    Ok(Job {
        id: JobId::from_string(get_str(row, "id")?),
        seq: get_i64(row, "seq")?,
        tenant_id: TenantId::from_string(get_str(row, "tenant_id")?),
        scenario: get_str(row, "scenario")?,
        engine,
        parameters,
        status,
        queue,
        priority,
        worker_id: get_opt_str(row, "worker_id")?.map(WorkerId::from_string),
        retry_count: get_i64(row, "retry_count")?.max(0) as u32,
        last_error: get_opt_str(row, "last_error")?,
        limits,
        created_at_ms: get_ms(row, "created_at_ms")?,
        started_at_ms: get_opt_ms(row, "started_at_ms")?,
        last_activity_ms: get_ms(row, "last_activity_ms")?,
        completed_at_ms: get_opt_ms(row, "completed_at_ms")?,
        next_attempt_at_ms: get_opt_ms(row, "next_attempt_at_ms")?,
        transitions,
    })
}

pub(crate) fn worker_from_row(row: &AnyRow) -> Result<WorkerNode, StoreError> {
    let status: WorkerStatus = parse_enum(&get_str(row, "status")?, "status")?;
    let capabilities: WorkerCapabilities =
        parse_json(&get_str(row, "capabilities")?, "capabilities")?;

    Ok(WorkerNode {
        id: WorkerId::from_string(get_str(row, "id")?),
        tenant_id: TenantId::from_string(get_str(row, "tenant_id")?),
        address: get_str(row, "address")?,
        capabilities,
        status,
        current_job: get_opt_str(row, "current_job")?.map(JobId::from_string),
        last_heartbeat_ms: get_ms(row, "last_heartbeat_ms")?,
        registered_at_ms: get_ms(row, "registered_at_ms")?,
    })
}

pub(crate) fn tenant_from_row(row: &AnyRow) -> Result<Tenant, StoreError> {
    let status: TenantStatus = parse_enum(&get_str(row, "status")?, "status")?;
    let quota: TenantQuota = parse_json(&get_str(row, "quota")?, "quota")?;

    Ok(Tenant {
        id: TenantId::from_string(get_str(row, "id")?),
        name: get_str(row, "name")?,
        plan: get_str(row, "plan")?,
        status,
        quota,
        expires_at_ms: get_opt_ms(row, "expires_at_ms")?,
        created_at_ms: get_ms(row, "created_at_ms")?,
        deleted_at_ms: get_opt_ms(row, "deleted_at_ms")?,
    })
}

pub(crate) fn to_json<T: serde::Serialize>(
    value: &T,
    column: &'static str,
) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(StoreError::column(column))
}
