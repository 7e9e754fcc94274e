// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared application state handed to every handler and loop.

use crate::env::MasterConfig;
use crate::metrics::Metrics;
use crate::retry::RetryEngine;
use recode_core::clock::{Clock, SystemClock};
use recode_store::Store;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Cheap to clone; everything inside is shared.
pub struct AppState<C: Clock = SystemClock> {
    pub store: Store<C>,
    pub metrics: Arc<Metrics>,
    pub config: Arc<MasterConfig>,
    pub retry: Arc<RetryEngine>,
    /// SHA-256 of the configured API key; comparisons run digest against
    /// digest so they take constant time regardless of where keys differ.
    api_key_digest: [u8; 32],
}

impl<C: Clock> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            metrics: Arc::clone(&self.metrics),
            config: Arc::clone(&self.config),
            retry: Arc::clone(&self.retry),
            api_key_digest: self.api_key_digest,
        }
    }
}

impl<C: Clock> AppState<C> {
    pub fn new(store: Store<C>, metrics: Metrics, config: MasterConfig) -> Self {
        let api_key_digest = Sha256::digest(config.api_key.as_bytes()).into();
        let retry = RetryEngine::new(config.retry_policy(), config.transient_matcher());
        Self {
            store,
            metrics: Arc::new(metrics),
            config: Arc::new(config),
            retry: Arc::new(retry),
            api_key_digest,
        }
    }

    /// Constant-time bearer key check.
    pub fn api_key_matches(&self, presented: &str) -> bool {
        let digest: [u8; 32] = Sha256::digest(presented.as_bytes()).into();
        digest == self.api_key_digest
    }
}
