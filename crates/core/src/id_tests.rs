// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::job::JobId;
use crate::worker::WorkerId;

#[test]
fn short_truncates_long_strings() {
    assert_eq!(short("abcdefgh", 4), "abcd");
    assert_eq!(short("abc", 4), "abc");
    assert_eq!(short("", 4), "");
}

#[test]
fn id_buf_round_trips() {
    let buf = IdBuf::new("job-abc123");
    assert_eq!(buf.as_str(), "job-abc123");
    assert!(!buf.is_empty());
    assert!(IdBuf::empty().is_empty());
}

#[test]
fn generated_ids_have_prefix_and_fixed_length() {
    let id = JobId::generate();
    assert!(id.as_str().starts_with("job-"));
    assert_eq!(id.as_str().len(), ID_MAX_LEN);

    let id = WorkerId::generate();
    assert!(id.as_str().starts_with("wrk-"));
}

#[test]
fn generated_ids_are_unique() {
    let a = JobId::generate();
    let b = JobId::generate();
    assert_ne!(a, b);
}

#[test]
fn id_from_string_and_display() {
    let id = JobId::from_string("job-fixed");
    assert_eq!(id.to_string(), "job-fixed");
    assert_eq!(id, "job-fixed");
    assert_eq!(id.short(7), "job-fix");
}

#[test]
fn id_serde_is_transparent() {
    let id = JobId::from_string("job-serde");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"job-serde\"");
    let parsed: JobId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn id_rejects_oversized_input_on_deserialize() {
    let long = format!("\"{}\"", "x".repeat(ID_MAX_LEN + 1));
    assert!(serde_json::from_str::<JobId>(&long).is_err());
}
