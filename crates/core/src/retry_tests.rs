// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    refused = { "connect to 10.0.0.5:8443: connection refused" },
    reset = { "Connection Reset by peer" },
    timeout = { "request timeout after 30s" },
    timed_out = { "operation timed out" },
    network = { "network error while uploading segment" },
    worker_died = { "worker died mid-encode" },
    stale = { "stale heartbeat, reassigned" },
)]
fn default_list_matches_transient_messages(error: &str) {
    assert!(TransientMatcher::default().is_transient(error));
    assert_eq!(TransientMatcher::default().classify(error), FailureClass::Transient);
}

#[parameterized(
    bad_input = { "invalid codec parameters: crf=99" },
    missing_file = { "input file not found" },
    oom = { "ffmpeg killed by oom" },
    empty = { "" },
)]
fn default_list_rejects_permanent_messages(error: &str) {
    assert_eq!(TransientMatcher::default().classify(error), FailureClass::Permanent);
}

#[test]
fn extras_extend_the_allowlist() {
    let matcher = TransientMatcher::with_extras(["  Quota Glitch ", "", "quota glitch"]);
    assert!(matcher.is_transient("transient QUOTA GLITCH upstream"));
    assert!(!TransientMatcher::default().is_transient("quota glitch"));
}

#[test]
fn raw_delay_doubles_until_the_cap() {
    let policy = RetryPolicy {
        max_retries: 10,
        base_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(8),
    };
    assert_eq!(policy.raw_delay(0), Duration::from_secs(1));
    assert_eq!(policy.raw_delay(1), Duration::from_secs(2));
    assert_eq!(policy.raw_delay(2), Duration::from_secs(4));
    assert_eq!(policy.raw_delay(3), Duration::from_secs(8));
    assert_eq!(policy.raw_delay(4), Duration::from_secs(8));
    assert_eq!(policy.raw_delay(64), Duration::from_secs(8));
}

#[test]
fn jittered_delay_stays_within_twenty_percent() {
    let policy = RetryPolicy::default();
    for attempt in 0..6 {
        let raw = policy.raw_delay(attempt);
        for _ in 0..50 {
            let jittered = policy.delay(attempt);
            assert!(jittered >= raw.mul_f64(0.8), "attempt {attempt}: {jittered:?} < 80%");
            assert!(jittered <= raw.mul_f64(1.2), "attempt {attempt}: {jittered:?} > 120%");
        }
    }
}

#[test]
fn allows_retry_up_to_max() {
    let policy = RetryPolicy { max_retries: 2, ..RetryPolicy::default() };
    assert!(policy.allows_retry(0));
    assert!(policy.allows_retry(1));
    assert!(!policy.allows_retry(2));
    assert!(!policy.allows_retry(3));
}
