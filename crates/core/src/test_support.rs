// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test helpers shared across crates (behind the `test-support` feature).

/// Proptest strategies over the domain enums.
pub mod strategies {
    use crate::job::{JobStatus, Priority, QueueClass};
    use proptest::prelude::*;

    pub fn job_status() -> impl Strategy<Value = JobStatus> {
        proptest::sample::select(JobStatus::ALL.to_vec())
    }

    pub fn queue_class() -> impl Strategy<Value = QueueClass> {
        proptest::sample::select(QueueClass::ALL.to_vec())
    }

    pub fn priority() -> impl Strategy<Value = Priority> {
        proptest::sample::select(Priority::ALL.to_vec())
    }
}
