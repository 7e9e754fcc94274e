// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn own_process_is_alive() {
    assert!(pid_alive(std::process::id()));
}

#[test]
fn reaped_child_is_not_alive() {
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let pid = child.id();
    child.wait().unwrap();
    assert!(!pid_alive(pid));
}

#[test]
fn list_processes_reads_comm_entries() {
    let root = TempDir::new().unwrap();
    std::fs::create_dir(root.path().join("101")).unwrap();
    std::fs::write(root.path().join("101").join("comm"), "ffmpeg\n").unwrap();
    std::fs::create_dir(root.path().join("202")).unwrap();
    std::fs::write(root.path().join("202").join("comm"), "sshd\n").unwrap();
    // Non-pid entries and entries without comm are skipped.
    std::fs::create_dir(root.path().join("self")).unwrap();
    std::fs::create_dir(root.path().join("303")).unwrap();

    let mut processes = list_processes(root.path());
    processes.sort();
    assert_eq!(processes, vec![(101, "ffmpeg".to_string()), (202, "sshd".to_string())]);
}

#[test]
fn list_processes_missing_root_is_empty() {
    assert!(list_processes(std::path::Path::new("/no/such/proc")).is_empty());
}
