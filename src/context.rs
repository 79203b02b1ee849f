// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the `ExternalDNS` controller.
//!
//! Every reconcile receives an `Arc<Context>` holding the collaborators of
//! the reconcile loop:
//! - API server access for the resource, its secrets and its status
//! - the dynamic [`WatchRegistry`]
//! - the [`CredentialProvisioner`], provider factory, record source and plan engine
//! - the process-wide lock serializing credential and plan stages
//! - per-resource error backoff state
//!
//! Collaborators sit behind traits so tests can swap in in-memory fakes.

use crate::constants::{
    DEFAULT_RECONCILE_TIMEOUT_SECS, DEFAULT_RESYNC_INTERVAL_SECS, ERROR_BACKOFF_BASE_SECS,
    ERROR_BACKOFF_MAX_SECS,
};
use crate::credentials::CredentialProvisioner;
use crate::plan::PlanEngine;
use crate::provider::ProviderFactory;
use crate::reconcilers::api::ExternalDnsApi;
use crate::source::Source;
use crate::watch_registry::WatchRegistry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Timing knobs of the reconcile loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// Requeue delay after a successful reconcile.
    pub resync_interval: Duration,
    /// Budget for one reconcile; each step runs against the same deadline.
    pub reconcile_timeout: Duration,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            resync_interval: Duration::from_secs(DEFAULT_RESYNC_INTERVAL_SECS),
            reconcile_timeout: Duration::from_secs(DEFAULT_RECONCILE_TIMEOUT_SECS),
        }
    }
}

/// Per-resource exponential requeue delays for failed reconciles.
///
/// The first failure waits `base`, every following one doubles the delay up
/// to `max`. A success forgets the resource.
#[derive(Debug)]
pub struct ErrorBackoff {
    base: Duration,
    max: Duration,
    failures: Mutex<HashMap<String, u32>>,
}

impl Default for ErrorBackoff {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(ERROR_BACKOFF_BASE_SECS),
            Duration::from_secs(ERROR_BACKOFF_MAX_SECS),
        )
    }
}

impl ErrorBackoff {
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failure for `key` and return the delay before the next attempt.
    pub fn next_delay(&self, key: &str) -> Duration {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let count = failures.entry(key.to_string()).or_insert(0);
        let delay = self
            .base
            .checked_mul(2u32.saturating_pow(*count))
            .map_or(self.max, |d| d.min(self.max));
        *count = count.saturating_add(1);
        delay
    }

    /// Forget the failures of `key`.
    pub fn reset(&self, key: &str) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Consecutive failures recorded for `key`.
    #[must_use]
    pub fn failures(&self, key: &str) -> u32 {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or(0)
    }
}

/// Shared context passed to every reconcile.
pub struct Context {
    /// `ExternalDNS`, Secret and status access
    pub api: Arc<dyn ExternalDnsApi>,

    /// Dynamically installed source watches
    pub watches: Arc<WatchRegistry>,

    /// Writes provider credentials to disk and environment
    pub credentials: CredentialProvisioner,

    /// Builds the registry/provider pair for a resource
    pub providers: Arc<dyn ProviderFactory>,

    /// Produces desired endpoints
    pub source: Arc<dyn Source>,

    pub engine: PlanEngine,

    /// Serializes the credential and plan stages across all resources
    pub apply_lock: tokio::sync::Mutex<()>,

    pub settings: ReconcileSettings,

    pub backoff: ErrorBackoff,
}

impl Context {
    #[must_use]
    pub fn new(
        api: Arc<dyn ExternalDnsApi>,
        watches: Arc<WatchRegistry>,
        credentials: CredentialProvisioner,
        providers: Arc<dyn ProviderFactory>,
        source: Arc<dyn Source>,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            api,
            watches,
            credentials,
            providers,
            source,
            engine: PlanEngine,
            apply_lock: tokio::sync::Mutex::new(()),
            settings,
            backoff: ErrorBackoff::default(),
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
