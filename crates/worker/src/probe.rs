// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local hardware probe for worker registration.

use crate::env::hostname;
use recode_core::worker::MachineClass;
use recode_wire::RegisterNodeRequest;
use std::collections::HashMap;
use std::path::Path;
use sysinfo::System;
use tokio::process::Command;

/// Probe CPU, RAM, GPU, and battery, producing the registration payload.
pub async fn probe_hardware(advertise_addr: &str) -> RegisterNodeRequest {
    let mut system = System::new();
    system.refresh_cpu_all();
    system.refresh_memory();

    let cpu_threads = system.cpus().len() as u32;
    let cpu_model = system
        .cpus()
        .first()
        .map(|cpu| cpu.brand().trim().to_string())
        .filter(|brand| !brand.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    let ram_bytes = system.total_memory();

    let gpu_type = probe_nvidia_gpu().await;
    let machine_class = classify_machine(Path::new("/sys/class/power_supply"));

    let mut labels = HashMap::new();
    labels.insert("hostname".to_string(), hostname());

    RegisterNodeRequest {
        address: advertise_addr.to_string(),
        machine_class,
        cpu_threads,
        cpu_model,
        has_gpu: gpu_type.is_some(),
        gpu_type,
        ram_bytes,
        labels,
    }
}

/// `nvidia-smi` is the de-facto probe; absence simply means no usable GPU.
async fn probe_nvidia_gpu() -> Option<String> {
    let output = Command::new("nvidia-smi")
        .args(["--query-gpu=name", "--format=csv,noheader"])
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let name = String::from_utf8_lossy(&output.stdout).lines().next()?.trim().to_string();
    (!name.is_empty()).then_some(name)
}

/// Battery present → laptop; otherwise assume a server. Desktops without
/// DMI access are indistinguishable from servers and schedule the same.
pub(crate) fn classify_machine(power_supply_dir: &Path) -> MachineClass {
    let Ok(entries) = std::fs::read_dir(power_supply_dir) else {
        return MachineClass::Server;
    };
    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().starts_with("BAT") {
            return MachineClass::Laptop;
        }
    }
    MachineClass::Server
}

/// Whether the master URL points at this very machine. Used to refuse
/// accidental self-registration unless explicitly allowed.
pub fn master_is_local(master_url: &str) -> bool {
    let rest = master_url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    // IPv6 loopback literals do not survive a ':' split.
    if rest.starts_with("::1") || rest.starts_with("[::1]") {
        return true;
    }
    let host = rest.split(['/', ':']).next().unwrap_or_default().to_lowercase();
    host == "localhost" || host == "127.0.0.1" || host == hostname().to_lowercase()
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
