// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job state machine.
//!
//! This module is the single source of truth for which status moves are
//! legal. The store consults it under a row lock before every write, so
//! scheduler, reconciler, worker reports, and user cancels can all race on
//! the same job without ever producing an illegal history.

use crate::job::JobStatus;
use thiserror::Error;

/// A move the state machine refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Outcome of checking a requested move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionVerdict {
    /// The move is legal and changes state.
    Apply,
    /// Already in the target state; callers treat this as success without
    /// touching the audit log (idempotent retries).
    Unchanged,
}

/// Check a requested move against the permitted-transition table.
pub fn transition_verdict(
    from: JobStatus,
    to: JobStatus,
) -> Result<TransitionVerdict, InvalidTransition> {
    use JobStatus::*;

    if from == to {
        return Ok(TransitionVerdict::Unchanged);
    }

    let permitted = matches!(
        (from, to),
        // Scheduler picks a worker, or the user gives up waiting.
        (Queued, Assigned) | (Queued, Cancelled)
        // Worker starts, rejects, or the assignment is reclaimed/cancelled.
        | (Assigned, Running) | (Assigned, Queued) | (Assigned, Cancelled)
        // Worker reports an outcome, or the retry engine intervenes.
        | (Running, Completed) | (Running, Failed) | (Running, Retrying) | (Running, Cancelled)
        // Backoff elapsed, or retries exhausted.
        | (Retrying, Queued) | (Retrying, Failed)
        // Reconciler reclassifies a failure as transient.
        | (Failed, Retrying)
    );

    if permitted {
        Ok(TransitionVerdict::Apply)
    } else {
        Err(InvalidTransition { from, to })
    }
}

/// All legal `(from, to)` pairs, excluding self-moves. Exposed for property
/// tests and documentation tooling.
pub fn permitted_transitions() -> Vec<(JobStatus, JobStatus)> {
    let mut pairs = Vec::new();
    for from in JobStatus::ALL {
        for to in JobStatus::ALL {
            if from != to && transition_verdict(from, to).is_ok() {
                pairs.push((from, to));
            }
        }
    }
    pairs
}

#[cfg(test)]
#[path = "fsm_tests.rs"]
mod tests;
