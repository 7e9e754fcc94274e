// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retention: bounded deletion of old terminal jobs.

use recode_core::clock::Clock;
use recode_store::{Store, StoreError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One sweep. The per-run bound keeps the delete transaction short; the
/// next interval picks up whatever remains.
pub async fn retention_tick<C: Clock>(
    store: &Store<C>,
    age: Duration,
    batch: i64,
) -> Result<u64, StoreError> {
    let cutoff = store.now_ms().saturating_sub(age.as_millis() as u64);
    store.delete_terminal_jobs_before(cutoff, batch).await
}

pub async fn run_retention<C: Clock>(
    store: Store<C>,
    age: Duration,
    batch: i64,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tracing::info!(
        age_s = age.as_secs(),
        batch,
        interval_ms = interval.as_millis() as u64,
        "retention started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.cancelled() => {
                tracing::info!("retention stopped");
                return;
            }
        }

        match retention_tick(&store, age, batch).await {
            Ok(0) => {}
            Ok(deleted) => tracing::info!(deleted, "retention sweep"),
            Err(e) => tracing::error!(error = %e, "retention sweep failed"),
        }
    }
}

#[cfg(test)]
#[path = "retention_tests.rs"]
mod tests;
