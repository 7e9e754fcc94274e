// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in transcode scenario catalog.
//!
//! A scenario names an output profile and carries the defaults the rest of
//! the system falls back to: the wall-clock timeout used when a job does not
//! set one, and whether the profile implies GPU encoding.

use crate::job::JobParams;
use std::time::Duration;

/// No job ever times out faster than this, whatever its limits say.
pub const GLOBAL_TIMEOUT_FLOOR: Duration = Duration::from_secs(60);

/// One entry in the scenario catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scenario {
    pub name: &'static str,
    pub default_timeout: Duration,
    pub needs_gpu: bool,
    /// Parameter keys this scenario reacts to. Unknown keys are carried
    /// through untouched; callers may log them.
    pub known_params: &'static [&'static str],
}

const COMMON_PARAMS: &[&str] = &[
    "duration",
    "input_url",
    "output_url",
    "bitrate_kbps",
    "preset",
    "crf",
    "gpu",
    "hwaccel",
    "audio_codec",
    "container",
    "persist_inputs",
    "persist_outputs",
];

const CATALOG: &[Scenario] = &[
    Scenario {
        name: "720p30-h264",
        default_timeout: Duration::from_secs(600),
        needs_gpu: false,
        known_params: COMMON_PARAMS,
    },
    Scenario {
        name: "1080p60-h264",
        default_timeout: Duration::from_secs(1800),
        needs_gpu: false,
        known_params: COMMON_PARAMS,
    },
    Scenario {
        name: "4k-hevc",
        default_timeout: Duration::from_secs(7200),
        needs_gpu: true,
        known_params: COMMON_PARAMS,
    },
    Scenario {
        name: "audio-only-aac",
        default_timeout: Duration::from_secs(300),
        needs_gpu: false,
        known_params: &["duration", "input_url", "output_url", "bitrate_kbps", "audio_codec"],
    },
];

/// Fallback for scenario names not in the catalog: conservative timeout,
/// no GPU implication.
const UNKNOWN: Scenario = Scenario {
    name: "unknown",
    default_timeout: Duration::from_secs(900),
    needs_gpu: false,
    known_params: COMMON_PARAMS,
};

impl Scenario {
    /// Exact-name lookup.
    pub fn lookup(name: &str) -> Option<&'static Scenario> {
        CATALOG.iter().find(|s| s.name == name)
    }

    /// Lookup with the unknown-scenario fallback. Never fails; submission
    /// accepts free-form scenario names.
    pub fn for_name(name: &str) -> &'static Scenario {
        Self::lookup(name).unwrap_or(&UNKNOWN)
    }

    /// Parameter keys the scenario does not document. Callers log these,
    /// nothing rejects them.
    pub fn unknown_params<'p>(&self, params: &'p JobParams) -> Vec<&'p str> {
        params
            .keys()
            .map(String::as_str)
            .filter(|k| !self.known_params.contains(k))
            .collect()
    }
}

#[cfg(test)]
#[path = "scenario_tests.rs"]
mod tests;
