// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! recode-govern binary: run, attach, and watch (auto-discovery) modes.

use recode_govern::{
    attach_governed, run_governed, DiscoveryConfig, DiscoveryDaemon, LimitSet, RunConfig,
};
use recode_core::clock::SystemClock;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn usage() -> &'static str {
    "usage:\n  recode-govern run [--cpu PCT] [--mem MB] [--nice N] [--scope NAME] -- COMMAND [ARGS...]\n  recode-govern attach PID [--cpu PCT] [--mem MB] [--nice N] [--scope NAME]\n  recode-govern watch [--target COMM]..."
}

struct Parsed {
    limits: LimitSet,
    scope: Option<String>,
    targets: Vec<String>,
    rest: Vec<String>,
    positional: Vec<String>,
}

fn next_value<'a>(
    iter: &mut std::slice::Iter<'a, String>,
    name: &str,
) -> Result<&'a str, String> {
    iter.next().map(String::as_str).ok_or_else(|| format!("{} needs a value", name))
}

fn parse_number<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, String> {
    raw.parse().map_err(|_| format!("{} expects a number, got {:?}", name, raw))
}

fn parse_flags(args: &[String]) -> Result<Parsed, String> {
    let mut parsed = Parsed {
        limits: LimitSet::default(),
        scope: None,
        targets: Vec::new(),
        rest: Vec::new(),
        positional: Vec::new(),
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--" => {
                parsed.rest = iter.cloned().collect();
                break;
            }
            "--cpu" => {
                parsed.limits.cpu_percent =
                    Some(parse_number(next_value(&mut iter, "--cpu")?, "--cpu")?)
            }
            "--mem" => {
                parsed.limits.memory_mb =
                    Some(parse_number(next_value(&mut iter, "--mem")?, "--mem")?)
            }
            "--nice" => {
                parsed.limits.nice =
                    Some(parse_number(next_value(&mut iter, "--nice")?, "--nice")?)
            }
            "--scope" => parsed.scope = Some(next_value(&mut iter, "--scope")?.to_string()),
            "--target" => parsed.targets.push(next_value(&mut iter, "--target")?.to_string()),
            other if other.starts_with("--") => return Err(format!("unknown flag {}", other)),
            other => parsed.positional.push(other.to_string()),
        }
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((mode, rest)) = args.split_first() else {
        eprintln!("{}", usage());
        return ExitCode::from(1);
    };
    let parsed = match parse_flags(rest) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{}\n{}", e, usage());
            return ExitCode::from(1);
        }
    };

    // Ctrl-C / SIGTERM interrupt the wrapper, never the workload.
    let interrupted = CancellationToken::new();
    {
        let interrupted = interrupted.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupted.cancel();
            }
        });
    }

    match mode.as_str() {
        "run" => {
            if parsed.rest.is_empty() {
                eprintln!("run mode needs a command after --\n{}", usage());
                return ExitCode::from(1);
            }
            let scope = parsed
                .scope
                .unwrap_or_else(|| format!("recode-run-{}", std::process::id()));
            let config = RunConfig::new(parsed.rest, parsed.limits, scope);
            // An interrupt detaches the wrapper; the tool keeps running in
            // its own process group.
            tokio::select! {
                result = run_governed(&config, CancellationToken::new()) => match result {
                    Ok(report) => {
                        println!("{}", report);
                        ExitCode::SUCCESS
                    }
                    Err(e) => {
                        eprintln!("run failed: {}", e);
                        ExitCode::from(2)
                    }
                },
                _ = interrupted.cancelled() => {
                    println!("detached_workload_continues");
                    ExitCode::SUCCESS
                }
            }
        }
        "attach" => {
            let Some(pid) = parsed.positional.first().and_then(|p| p.parse::<u32>().ok()) else {
                eprintln!("attach mode needs a pid\n{}", usage());
                return ExitCode::from(1);
            };
            let scope = parsed.scope.unwrap_or_else(|| format!("recode-attach-{}", pid));
            match attach_governed(
                pid,
                &parsed.limits,
                &PathBuf::from("/sys/fs/cgroup"),
                &scope,
                interrupted,
            )
            .await
            {
                Ok(report) => {
                    println!("{}", report);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("attach failed: {}", e);
                    ExitCode::from(2)
                }
            }
        }
        "watch" => {
            let mut config = DiscoveryConfig {
                scan_interval: Duration::from_secs(10),
                ..DiscoveryConfig::default()
            };
            if !parsed.targets.is_empty() {
                config.targets = parsed.targets;
            }
            if !parsed.limits.is_empty() {
                config.limits = parsed.limits;
            }
            tracing::info!(targets = ?config.targets, "discovery daemon starting");
            DiscoveryDaemon::new(config, SystemClock, interrupted).run().await;
            ExitCode::SUCCESS
        }
        other => {
            eprintln!("unknown mode {:?}\n{}", other, usage());
            ExitCode::from(1)
        }
    }
}
