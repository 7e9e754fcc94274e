// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn oom_score_adj_writes_into_proc_entry() {
    let proc_root = TempDir::new().unwrap();
    std::fs::create_dir(proc_root.path().join("1234")).unwrap();

    assert!(write_oom_score_adj(proc_root.path(), 1234, 300));
    assert_eq!(
        std::fs::read_to_string(proc_root.path().join("1234").join("oom_score_adj")).unwrap(),
        "300"
    );
}

#[test]
fn oom_score_adj_missing_process_is_a_warning_not_an_error() {
    let proc_root = TempDir::new().unwrap();
    assert!(!write_oom_score_adj(proc_root.path(), 9999, 300));
}

#[tokio::test]
async fn apply_with_empty_limits_touches_nothing() {
    assert_eq!(apply(std::process::id(), &LimitSet::default()).await, 0);
}
