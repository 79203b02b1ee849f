// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line and environment configuration of the controller.

use crate::constants::{
    DEFAULT_CREDENTIALS_DIR, DEFAULT_RECONCILE_TIMEOUT_SECS, DEFAULT_RESYNC_INTERVAL_SECS,
    METRICS_SERVER_BIND_ADDRESS, METRICS_SERVER_PORT,
};
use crate::context::ReconcileSettings;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// extdns - synchronize DNS records from cluster objects into external DNS providers
#[derive(Clone, Debug, Parser)]
#[command(name = "extdns", version, about)]
pub struct Config {
    /// Only reconcile `ExternalDNS` objects in this namespace (default: all namespaces)
    #[arg(long, env = "EXTDNS_NAMESPACE")]
    pub namespace: Option<String>,

    /// Port of the metrics and health endpoints
    #[arg(long, env = "EXTDNS_METRICS_PORT", default_value_t = METRICS_SERVER_PORT)]
    pub metrics_port: u16,

    /// Address the metrics server binds to
    #[arg(long, env = "EXTDNS_METRICS_BIND_ADDRESS", default_value = METRICS_SERVER_BIND_ADDRESS)]
    pub metrics_bind_address: String,

    /// Base directory for materialized provider credentials
    #[arg(long, env = "EXTDNS_CREDENTIALS_DIR", default_value = DEFAULT_CREDENTIALS_DIR)]
    pub credentials_dir: PathBuf,

    /// Seconds between periodic reconciles of a healthy resource
    #[arg(long, env = "EXTDNS_RESYNC_SECS", default_value_t = DEFAULT_RESYNC_INTERVAL_SECS)]
    pub resync_secs: u64,

    /// Seconds one reconcile may take before the running step fails
    #[arg(long, env = "EXTDNS_RECONCILE_TIMEOUT_SECS", default_value_t = DEFAULT_RECONCILE_TIMEOUT_SECS)]
    pub reconcile_timeout_secs: u64,
}

impl Config {
    #[must_use]
    pub fn reconcile_settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            resync_interval: Duration::from_secs(self.resync_secs),
            reconcile_timeout: Duration::from_secs(self.reconcile_timeout_secs),
        }
    }

    /// Namespace filter, with an empty value meaning all namespaces.
    #[must_use]
    pub fn watch_namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
