// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job execution flow.
//!
//! Preflight the declared limits, run the tool under the governance
//! wrapper, heartbeat while it runs, enforce the wall-clock timeout, and
//! clean the scratch directory according to the retention flags. The
//! master is the authority on job state; this module only reports.

use crate::client::MasterClient;
use crate::env::WorkerConfig;
use nix::sys::statvfs::statvfs;
use recode_core::job::{EngineHint, Job};
use recode_core::worker::WorkerId;
use recode_govern::{run_governed, ExitReport, LimitSet, RunConfig};
use recode_wire::request::{ResultStatus, SubmitResultRequest};
use std::path::{Path, PathBuf};
use std::time::Duration;
use sysinfo::System;
use tokio_util::sync::CancellationToken;

/// SIGTERM-to-SIGKILL window for cancelled jobs.
const CANCEL_GRACE: Duration = Duration::from_secs(30);

/// What a finished execution reports upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed(String),
    /// Cancelled on request; the master already holds the terminal state.
    Cancelled,
}

pub struct ExecContext {
    pub config: WorkerConfig,
    pub client: MasterClient,
    pub worker_id: WorkerId,
}

/// Run one job start to finish and report the result.
pub async fn execute_job(ctx: &ExecContext, job: &Job, cancel: CancellationToken) {
    tracing::info!(job_id = %job.id, scenario = %job.scenario, "job execution starting");
    let outcome = run_job(ctx, job, cancel).await;

    match &outcome {
        JobOutcome::Completed => {
            report(ctx, job, ResultStatus::Completed, None).await;
            tracing::info!(job_id = %job.id, "job completed");
        }
        JobOutcome::Failed(error) => {
            report(ctx, job, ResultStatus::Failed, Some(error.clone())).await;
            tracing::warn!(job_id = %job.id, error = %error, "job failed");
        }
        JobOutcome::Cancelled => {
            tracing::info!(job_id = %job.id, "job cancelled, tool torn down");
        }
    }
}

async fn run_job(ctx: &ExecContext, job: &Job, cancel: CancellationToken) -> JobOutcome {
    let job_dir = ctx.config.work_dir.join(job.id.as_str());
    if let Err(e) = std::fs::create_dir_all(&job_dir) {
        return JobOutcome::Failed(format!("scratch dir: {}", e));
    }

    if let Err(message) = preflight(job, &job_dir) {
        cleanup(&ctx.config, &job_dir, false);
        return JobOutcome::Failed(message);
    }

    let command = build_tool_command(job, &job_dir);
    let mut run_config = RunConfig::new(
        command,
        LimitSet::from(&job.limits),
        format!("recode-{}", job.id),
    );
    run_config.term_grace = CANCEL_GRACE;

    // Job-level liveness while the tool runs.
    let heartbeat_stop = CancellationToken::new();
    let heartbeat_task = {
        let stop = heartbeat_stop.clone();
        let client = ctx.client.clone();
        let job_id = job.id;
        let interval = ctx.config.heartbeat_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop.cancelled() => return,
                }
                if let Err(e) = client.update_job_heartbeat(&job_id).await {
                    tracing::warn!(job_id = %job_id, error = %e, "job heartbeat failed");
                }
            }
        })
    };

    let teardown = CancellationToken::new();
    let timeout = job.effective_timeout();
    let run = run_governed(&run_config, teardown.clone());
    tokio::pin!(run);

    enum Interrupt {
        Cancelled,
        TimedOut,
    }
    let mut interrupt = None;
    let result = tokio::select! {
        result = &mut run => Some(result),
        _ = cancel.cancelled() => {
            interrupt = Some(Interrupt::Cancelled);
            None
        }
        _ = tokio::time::sleep(timeout) => {
            interrupt = Some(Interrupt::TimedOut);
            None
        }
    };

    let outcome = match result {
        Some(Ok(ExitReport::CompletedSuccessfully)) => JobOutcome::Completed,
        Some(Ok(ExitReport::NonZeroExit(code))) => {
            JobOutcome::Failed(format!("tool exited with status {:?}", code))
        }
        Some(Ok(other)) => JobOutcome::Failed(format!("unexpected exit report {}", other)),
        Some(Err(e)) => JobOutcome::Failed(format!("tool launch failed: {}", e)),
        None => {
            // Interrupted: tear the tool down (SIGTERM, grace, SIGKILL)
            // and wait out the run.
            teardown.cancel();
            let _ = run.await;
            match interrupt {
                Some(Interrupt::Cancelled) | None => {
                    tracing::info!(job_id = %job.id, "cancel received, tool torn down");
                    JobOutcome::Cancelled
                }
                Some(Interrupt::TimedOut) => {
                    tracing::warn!(job_id = %job.id, timeout_s = timeout.as_secs(), "job timeout");
                    JobOutcome::Failed(format!("timeout after {}s", timeout.as_secs()))
                }
            }
        }
    };

    heartbeat_stop.cancel();
    let _ = heartbeat_task.await;

    cleanup(&ctx.config, &job_dir, outcome == JobOutcome::Completed);
    outcome
}

/// Check the declared disk and memory ceilings against the host before
/// spending any cycles. A host that cannot satisfy them fails the job
/// permanently; retrying on the same worker would not help.
fn preflight(job: &Job, job_dir: &Path) -> Result<(), String> {
    if let Some(need_mb) = job.limits.max_disk_mb {
        let stat = statvfs(job_dir).map_err(|e| format!("preflight statvfs: {}", e))?;
        let available_mb =
            (stat.blocks_available() as u64).saturating_mul(stat.fragment_size() as u64)
                / (1024 * 1024);
        if available_mb < need_mb {
            return Err(format!(
                "preflight: {}MB disk required, {}MB available",
                need_mb, available_mb
            ));
        }
    }
    if let Some(need_mb) = job.limits.max_memory_mb {
        let mut system = System::new();
        system.refresh_memory();
        let available_mb = system.available_memory() / (1024 * 1024);
        if available_mb < need_mb {
            return Err(format!(
                "preflight: {}MB memory required, {}MB available",
                need_mb, available_mb
            ));
        }
    }
    Ok(())
}

/// Assemble the opaque tool invocation for the job's engine.
///
/// Jobs with an `input_url` transcode it; jobs without one synthesize a
/// test source so smoke scenarios (`{duration: 5}`) run anywhere.
pub(crate) fn build_tool_command(job: &Job, job_dir: &Path) -> Vec<String> {
    let engine = match job.engine {
        EngineHint::Gstreamer => "gst-launch-1.0",
        EngineHint::Ffmpeg | EngineHint::Auto => "ffmpeg",
    };
    let output = output_path(job_dir);
    let duration = job
        .parameters
        .get("duration")
        .and_then(|v| v.as_u64())
        .unwrap_or(10);

    if engine == "gst-launch-1.0" {
        return vec![
            engine.to_string(),
            "videotestsrc".to_string(),
            format!("num-buffers={}", duration * 30),
            "!".to_string(),
            "x264enc".to_string(),
            "!".to_string(),
            "mp4mux".to_string(),
            "!".to_string(),
            "filesink".to_string(),
            format!("location={}", output.display()),
        ];
    }

    let mut command = vec![engine.to_string(), "-y".to_string(), "-nostdin".to_string()];
    match job.parameters.get("input_url").and_then(|v| v.as_str()) {
        Some(input) => command.extend(["-i".to_string(), input.to_string()]),
        None => command.extend([
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!("testsrc=duration={}:size=1280x720:rate=30", duration),
        ]),
    }
    if let Some(bitrate) = job.parameters.get("bitrate_kbps").and_then(|v| v.as_u64()) {
        command.extend(["-b:v".to_string(), format!("{}k", bitrate)]);
    }
    if let Some(preset) = job.parameters.get("preset").and_then(|v| v.as_str()) {
        command.extend(["-preset".to_string(), preset.to_string()]);
    }
    command.extend(["-c:v".to_string(), codec_for(&job.scenario).to_string()]);
    command.push(output.display().to_string());
    command
}

fn codec_for(scenario: &str) -> &'static str {
    if scenario.contains("hevc") {
        "libx265"
    } else if scenario.contains("aac") {
        "aac"
    } else {
        "libx264"
    }
}

pub(crate) fn output_path(job_dir: &Path) -> PathBuf {
    job_dir.join("output.mp4")
}

/// Scratch cleanup per the retention flags. Partial outputs from failed or
/// cancelled runs are always removed.
pub(crate) fn cleanup(config: &WorkerConfig, job_dir: &Path, succeeded: bool) {
    let keep_outputs = succeeded && config.persist_outputs;
    if keep_outputs {
        if !config.persist_inputs {
            for name in ["input.mp4", "input.tmp"] {
                let _ = std::fs::remove_file(job_dir.join(name));
            }
        }
        return;
    }
    if config.persist_inputs {
        let _ = std::fs::remove_file(output_path(job_dir));
        return;
    }
    if let Err(e) = std::fs::remove_dir_all(job_dir) {
        tracing::debug!(dir = %job_dir.display(), error = %e, "scratch cleanup skipped");
    }
}

async fn report(ctx: &ExecContext, job: &Job, status: ResultStatus, error: Option<String>) {
    let request = SubmitResultRequest {
        job_id: job.id,
        node_id: ctx.worker_id,
        status,
        error,
        logs: None,
        metrics: None,
    };
    if let Err(e) = ctx.client.submit_result(&request).await {
        tracing::error!(job_id = %job.id, error = %e, "result upload failed");
    }
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
