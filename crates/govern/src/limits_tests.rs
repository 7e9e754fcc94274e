// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn from_resource_limits_maps_cpu_and_memory() {
    let limits = ResourceLimits {
        max_cpu_percent: Some(150),
        max_memory_mb: Some(4096),
        max_disk_mb: Some(10_000),
        timeout_sec: Some(600),
    };
    let set = LimitSet::from(&limits);
    assert_eq!(set.cpu_percent, Some(150));
    assert_eq!(set.memory_mb, Some(4096));
    // Disk and timeout are enforced elsewhere (preflight and deadlines).
    assert!(set.io_weight.is_none());
    assert!(set.nice.is_none());
}

#[test]
fn empty_set_detection() {
    assert!(LimitSet::default().is_empty());
    assert!(!LimitSet { nice: Some(5), ..Default::default() }.is_empty());
}

#[test]
fn discovery_default_is_conservative() {
    let set = LimitSet::discovery_default();
    assert_eq!(set.cpu_percent, Some(50));
    assert_eq!(set.memory_mb, Some(2048));
    assert_eq!(set.nice, Some(10));
    assert!(set.oom_score_adj.unwrap() > 0);
}

#[test]
fn serde_round_trip_skips_absent_fields() {
    let set = LimitSet { cpu_percent: Some(80), ..Default::default() };
    let json = serde_json::to_string(&set).unwrap();
    assert_eq!(json, r#"{"cpu_percent":80}"#);
    let back: LimitSet = serde_json::from_str(&json).unwrap();
    assert_eq!(back, set);
}
