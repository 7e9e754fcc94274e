// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_env() {
    for name in [
        "RECODE_MASTER_URL",
        "MASTER_API_KEY",
        "RECODE_TENANT",
        "RECODE_MAX_CONCURRENT_JOBS",
        "RECODE_HEARTBEAT_INTERVAL_MS",
        "RECODE_POLL_INTERVAL_MS",
        "RECODE_SHUTDOWN_TIMEOUT_MS",
        "RECODE_PERSIST_INPUTS",
        "RECODE_PERSIST_OUTPUTS",
        "RECODE_ALLOW_MASTER_AS_WORKER",
        "RECODE_WORK_DIR",
        "RECODE_ADVERTISE_ADDR",
    ] {
        std::env::remove_var(name);
    }
}

#[test]
#[serial]
fn requires_master_url_and_api_key() {
    clear_env();
    assert!(matches!(
        WorkerConfig::from_env(),
        Err(ConfigError::Missing("RECODE_MASTER_URL"))
    ));

    std::env::set_var("RECODE_MASTER_URL", "https://master:8443");
    assert!(matches!(
        WorkerConfig::from_env(),
        Err(ConfigError::Missing("MASTER_API_KEY"))
    ));
    clear_env();
}

#[test]
#[serial]
fn defaults_are_sensible() {
    clear_env();
    std::env::set_var("RECODE_MASTER_URL", "https://master:8443/");
    std::env::set_var("MASTER_API_KEY", "sekrit");

    let config = WorkerConfig::from_env().unwrap();
    assert_eq!(config.master_url, "https://master:8443", "trailing slash trimmed");
    assert_eq!(config.tenant, "default");
    assert_eq!(config.max_concurrent_jobs, 2);
    assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
    assert!(!config.persist_inputs);
    assert!(config.persist_outputs, "outputs retained by default");
    assert!(!config.allow_master_as_worker);
    clear_env();
}

#[test]
#[serial]
fn overrides_are_honored() {
    clear_env();
    std::env::set_var("RECODE_MASTER_URL", "https://master:8443");
    std::env::set_var("MASTER_API_KEY", "sekrit");
    std::env::set_var("RECODE_TENANT", "acme");
    std::env::set_var("RECODE_MAX_CONCURRENT_JOBS", "8");
    std::env::set_var("RECODE_HEARTBEAT_INTERVAL_MS", "2500");
    std::env::set_var("RECODE_PERSIST_INPUTS", "true");
    std::env::set_var("RECODE_PERSIST_OUTPUTS", "false");

    let config = WorkerConfig::from_env().unwrap();
    assert_eq!(config.tenant, "acme");
    assert_eq!(config.max_concurrent_jobs, 8);
    assert_eq!(config.heartbeat_interval, Duration::from_millis(2500));
    assert!(config.persist_inputs);
    assert!(!config.persist_outputs);
    clear_env();
}

#[test]
#[serial]
fn invalid_numbers_are_rejected() {
    clear_env();
    std::env::set_var("RECODE_MASTER_URL", "https://master:8443");
    std::env::set_var("MASTER_API_KEY", "sekrit");
    std::env::set_var("RECODE_MAX_CONCURRENT_JOBS", "zero");
    assert!(matches!(WorkerConfig::from_env(), Err(ConfigError::Invalid { .. })));

    std::env::set_var("RECODE_MAX_CONCURRENT_JOBS", "0");
    assert!(matches!(WorkerConfig::from_env(), Err(ConfigError::Invalid { .. })));
    clear_env();
}
