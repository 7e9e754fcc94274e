// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    millis = { "250ms", 0, 250_000_000 },
    bare_seconds = { "45", 45, 0 },
    seconds = { "30s", 30, 0 },
    minutes = { "5m", 300, 0 },
    hours = { "2h", 7200, 0 },
    days = { "1d", 86400, 0 },
    padded = { "  10s ", 10, 0 },
)]
fn parses_valid_durations(input: &str, secs: u64, nanos: u32) {
    let d = parse_duration(input).unwrap();
    assert_eq!(d, Duration::new(secs, nanos));
}

#[parameterized(
    empty = { "" },
    no_number = { "ms" },
    bad_suffix = { "10parsecs" },
    negative = { "-5s" },
)]
fn rejects_invalid_durations(input: &str) {
    assert!(parse_duration(input).is_err());
}
