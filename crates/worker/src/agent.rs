// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker agent main loop.
//!
//! A counted semaphore bounds concurrent executions: the loop only polls
//! the master while a slot is free, and each received job carries its
//! permit into a spawned execution task. Heartbeats run on their own
//! ticker and relay cancellations into the per-job tokens.

use crate::client::MasterClient;
use crate::env::WorkerConfig;
use crate::exec::{execute_job, ExecContext};
use crate::probe::{master_is_local, probe_hardware};
use parking_lot::Mutex;
use recode_core::job::JobId;
use recode_core::worker::{WorkerId, WorkerStatus};
use recode_wire::HeartbeatRequest;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("registration refused: master resolves to this host (set RECODE_ALLOW_MASTER_AS_WORKER to override)")]
    MasterIsLocal,
    #[error("registration failed: {0}")]
    Registration(#[from] crate::client::ClientError),
}

/// Running jobs and their cancellation handles.
type ActiveJobs = Arc<Mutex<HashMap<JobId, CancellationToken>>>;

pub struct WorkerAgent {
    config: WorkerConfig,
    client: MasterClient,
    shutdown: CancellationToken,
}

impl WorkerAgent {
    pub fn new(config: WorkerConfig, shutdown: CancellationToken) -> Self {
        let client = MasterClient::new(&config.master_url, &config.api_key, &config.tenant);
        Self { config, client, shutdown }
    }

    /// Register and run until shutdown. Returns once all slots drained (or
    /// the drain window expired).
    pub async fn run(self) -> Result<(), AgentError> {
        if master_is_local(&self.config.master_url) && !self.config.allow_master_as_worker {
            return Err(AgentError::MasterIsLocal);
        }

        let request = probe_hardware(&self.config.advertise_addr).await;
        tracing::info!(
            cpu_threads = request.cpu_threads,
            cpu_model = %request.cpu_model,
            has_gpu = request.has_gpu,
            machine_class = %request.machine_class,
            "hardware probed"
        );
        let registered = self.client.register(&request).await?;
        let worker_id = registered.id;
        tracing::info!(worker_id = %worker_id, "registered with master");

        let slots = Arc::new(Semaphore::new(self.config.max_concurrent_jobs));
        let active: ActiveJobs = Arc::new(Mutex::new(HashMap::new()));

        let heartbeat_task = tokio::spawn(heartbeat_loop(
            self.client.clone(),
            self.config.heartbeat_interval,
            worker_id,
            Arc::clone(&active),
            self.shutdown.clone(),
        ));

        let ctx = Arc::new(ExecContext {
            config: self.config.clone(),
            client: self.client.clone(),
            worker_id,
        });

        loop {
            tokio::select! {
                permit = Arc::clone(&slots).acquire_owned() => {
                    let Ok(permit) = permit else { break };
                    tokio::select! {
                        _ = self.poll_and_spawn(&ctx, permit, &active) => {}
                        _ = self.shutdown.cancelled() => break,
                    }
                }
                _ = self.shutdown.cancelled() => break,
            }
        }

        // Drain: stop polling, keep heartbeating, wait for running jobs.
        tracing::info!(
            timeout_s = self.config.shutdown_timeout.as_secs(),
            "shutdown requested, draining slots"
        );
        let drained = tokio::time::timeout(
            self.config.shutdown_timeout,
            slots.acquire_many(self.config.max_concurrent_jobs as u32),
        )
        .await;
        match drained {
            Ok(_) => tracing::info!("all slots drained"),
            Err(_) => tracing::warn!("drain window expired with jobs still running"),
        }

        heartbeat_task.abort();
        if let Err(e) = self.client.deregister(&worker_id).await {
            tracing::warn!(error = %e, "deregistration failed");
        }
        Ok(())
    }

    /// One poll: if the master has work for us, spawn its execution task
    /// (the permit travels with it). Otherwise sleep out the poll interval.
    async fn poll_and_spawn(
        &self,
        ctx: &Arc<ExecContext>,
        permit: tokio::sync::OwnedSemaphorePermit,
        active: &ActiveJobs,
    ) {
        let job = match self.client.next_job(&ctx.worker_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                drop(permit);
                tokio::time::sleep(self.config.poll_interval).await;
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "poll failed");
                drop(permit);
                tokio::time::sleep(self.config.poll_interval).await;
                return;
            }
        };

        let cancel = CancellationToken::new();
        active.lock().insert(job.id, cancel.clone());
        tracing::info!(job_id = %job.id, scenario = %job.scenario, "job received");

        let ctx = Arc::clone(ctx);
        let active = Arc::clone(active);
        tokio::spawn(async move {
            execute_job(&ctx, &job, cancel).await;
            active.lock().remove(&job.id);
            drop(permit);
        });
    }
}

/// Heartbeat every interval, reporting one of the running jobs so the
/// master refreshes its liveness, and fan incoming cancellations out to
/// the matching execution tasks.
async fn heartbeat_loop(
    client: MasterClient,
    interval: std::time::Duration,
    worker_id: WorkerId,
    active: ActiveJobs,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut system = sysinfo::System::new();
    loop {
        ticker.tick().await;
        system.refresh_cpu_usage();
        let cpu_percent = Some(system.global_cpu_usage() as f64);
        let (current_job, status) = {
            let active = active.lock();
            let current = active.keys().next().copied();
            let status = if current.is_some() {
                WorkerStatus::Busy
            } else if shutdown.is_cancelled() {
                WorkerStatus::Draining
            } else {
                WorkerStatus::Available
            };
            (current, status)
        };

        let request = HeartbeatRequest { status, current_job, cpu_percent };
        match client.heartbeat(&worker_id, &request).await {
            Ok(reply) => {
                for job_id in reply.cancelled_jobs {
                    if let Some(cancel) = active.lock().get(&job_id) {
                        tracing::info!(job_id = %job_id, "cancellation received via heartbeat");
                        cancel.cancel();
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "heartbeat failed"),
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
