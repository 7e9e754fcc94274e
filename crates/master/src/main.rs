// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! recode-master binary entry point.
//!
//! Startup failures (bad config, unreachable store, bind failure) exit 1;
//! fatal runtime errors exit 2; clean shutdown exits 0.

use recode_core::clock::SystemClock;
use recode_master::api;
use recode_master::metrics::Metrics;
use recode_master::reconciler::{run_reconciler, ReconcileConfig};
use recode_master::retention::run_retention;
use recode_master::scheduler::run_scheduler;
use recode_master::{AppState, MasterConfig};
use recode_store::Store;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,recode_master=debug,sqlx=warn".into()),
        )
        .init();

    let config = match MasterConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration invalid");
            return ExitCode::from(1);
        }
    };
    config.log_startup();

    let store = match Store::open(config.db_kind, &config.db_dsn, SystemClock).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "store unreachable");
            return ExitCode::from(1);
        }
    };
    let metrics = match Metrics::new() {
        Ok(metrics) => metrics,
        Err(e) => {
            tracing::error!(error = %e, "metrics registry failed");
            return ExitCode::from(1);
        }
    };

    let state = AppState::new(store.clone(), metrics, config.clone());
    let shutdown = CancellationToken::new();

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut sigterm = match tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::terminate(),
            ) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::error!(error = %e, "signal handler install failed");
                    return;
                }
            };
            tokio::select! {
                _ = sigterm.recv() => {}
                _ = tokio::signal::ctrl_c() => {}
            }
            tracing::info!("shutdown signal received");
            shutdown.cancel();
        });
    }

    let scheduler = tokio::spawn(run_scheduler(
        store.clone(),
        Arc::clone(&state.metrics),
        config.scheduler_interval,
        config.schedule_batch,
        shutdown.clone(),
    ));
    let reconciler = tokio::spawn(run_reconciler(
        store.clone(),
        Arc::clone(&state.retry),
        ReconcileConfig {
            worker_failure_window: config.worker_failure_window(),
            assignment_grace: config.worker_failure_window(),
        },
        config.reconcile_interval,
        shutdown.clone(),
    ));
    let retention = tokio::spawn(run_retention(
        store.clone(),
        config.retention_age,
        config.retention_batch,
        config.retention_interval,
        shutdown.clone(),
    ));

    let listener = match tokio::net::TcpListener::bind(&config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %config.listen_addr, error = %e, "bind failed");
            return ExitCode::from(1);
        }
    };
    tracing::info!(addr = %config.listen_addr, "master listening");

    let server = axum::serve(listener, api::router(state)).with_graceful_shutdown({
        let shutdown = shutdown.clone();
        async move { shutdown.cancelled().await }
    });

    let exit = match server.await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server failed");
            ExitCode::from(2)
        }
    };

    shutdown.cancel();
    let _ = tokio::join!(scheduler, reconciler, retention);
    tracing::info!("master stopped");
    exit
}
