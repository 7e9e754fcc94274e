// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::limits::LimitSet;
use tempfile::TempDir;

fn v2_root() -> TempDir {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("cgroup.controllers"), "cpu io memory").unwrap();
    root
}

fn v1_root() -> TempDir {
    let root = TempDir::new().unwrap();
    for controller in ["cpu", "memory", "blkio"] {
        std::fs::create_dir(root.path().join(controller)).unwrap();
    }
    root
}

#[test]
fn detect_prefers_v2() {
    let v2 = v2_root();
    assert_eq!(CgroupScope::detect(v2.path()), Some(CgroupVersion::V2));

    let v1 = v1_root();
    assert_eq!(CgroupScope::detect(v1.path()), Some(CgroupVersion::V1));

    let none = TempDir::new().unwrap();
    assert_eq!(CgroupScope::detect(none.path()), None);
}

#[test]
fn v2_apply_writes_expected_files() {
    let root = v2_root();
    let scope = CgroupScope::create(root.path(), CgroupVersion::V2, "job-1").unwrap();
    let limits = LimitSet {
        cpu_percent: Some(150),
        cpu_weight: Some(200),
        memory_mb: Some(1024),
        io_weight: Some(50),
        nice: None,
        oom_score_adj: None,
    };
    assert_eq!(scope.apply(&limits), 4);

    let dir = root.path().join("job-1");
    assert_eq!(std::fs::read_to_string(dir.join("cpu.max")).unwrap(), "150000 100000");
    assert_eq!(std::fs::read_to_string(dir.join("cpu.weight")).unwrap(), "200");
    assert_eq!(
        std::fs::read_to_string(dir.join("memory.max")).unwrap(),
        (1024u64 * 1024 * 1024).to_string()
    );
    assert_eq!(std::fs::read_to_string(dir.join("io.weight")).unwrap(), "50");
}

#[test]
fn v1_apply_writes_per_controller_files() {
    let root = v1_root();
    let scope = CgroupScope::create(root.path(), CgroupVersion::V1, "job-2").unwrap();
    let limits = LimitSet {
        cpu_percent: Some(50),
        memory_mb: Some(512),
        ..Default::default()
    };
    assert_eq!(scope.apply(&limits), 2);

    let cpu = root.path().join("cpu").join("job-2");
    assert_eq!(std::fs::read_to_string(cpu.join("cpu.cfs_quota_us")).unwrap(), "50000");
    assert_eq!(std::fs::read_to_string(cpu.join("cpu.cfs_period_us")).unwrap(), "100000");
    let memory = root.path().join("memory").join("job-2");
    assert_eq!(
        std::fs::read_to_string(memory.join("memory.limit_in_bytes")).unwrap(),
        (512u64 * 1024 * 1024).to_string()
    );
}

#[test]
fn attach_writes_pid_to_procs_file() {
    let root = v2_root();
    let scope = CgroupScope::create(root.path(), CgroupVersion::V2, "job-3").unwrap();
    scope.attach(4242).unwrap();
    assert_eq!(
        std::fs::read_to_string(root.path().join("job-3").join("cgroup.procs")).unwrap(),
        "4242"
    );
}

#[test]
fn apply_counts_only_successful_writes() {
    // No hierarchy under the scope dir: create() makes it, then we remove
    // it so every write fails.
    let root = v2_root();
    let scope = CgroupScope::create(root.path(), CgroupVersion::V2, "job-4").unwrap();
    std::fs::remove_dir_all(root.path().join("job-4")).unwrap();

    let limits = LimitSet { cpu_percent: Some(100), memory_mb: Some(256), ..Default::default() };
    assert_eq!(scope.apply(&limits), 0, "failed writes are warnings, not errors");
}

#[test]
fn cleanup_removes_empty_scope_dirs() {
    let root = v2_root();
    let scope = CgroupScope::create(root.path(), CgroupVersion::V2, "job-5").unwrap();
    assert!(root.path().join("job-5").is_dir());
    scope.cleanup();
    assert!(!root.path().join("job-5").exists());
}
