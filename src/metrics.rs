// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the extdns controller.
//!
//! Every metric name starts with `extdns_firestoned_io_`, the
//! prometheus-safe form of the API group.
//!
//! # Example
//!
//! ```rust,no_run
//! use extdns::metrics::{record_reconciliation, Outcome};
//!
//! record_reconciliation("ExternalDNS", Outcome::Success, std::time::Duration::from_secs(1));
//! ```

use prometheus::core::Collector;
use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

const METRICS_NAMESPACE: &str = "extdns_firestoned_io";

/// Registry served on `/metrics`.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn registered<C: Collector + Clone + 'static>(collector: C) -> C {
    METRICS_REGISTRY.register(Box::new(collector.clone())).unwrap();
    collector
}

fn name(suffix: &str) -> String {
    format!("{METRICS_NAMESPACE}_{suffix}")
}

/// Reconciles by resource type and outcome (`success`, `error`).
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    registered(
        CounterVec::new(
            Opts::new(name("reconciliations_total"), "Total number of reconciliations by resource type and status"),
            &["resource_type", "status"],
        )
        .unwrap(),
    )
});

pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    registered(
        HistogramVec::new(
            HistogramOpts::new(
                name("reconciliation_duration_seconds"),
                "Duration of reconciliations in seconds by resource type",
            )
            .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 300.0]),
            &["resource_type"],
        )
        .unwrap(),
    )
});

/// Record changes written to providers, labelled `create`, `update` or `delete`.
pub static PLAN_CHANGES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    registered(
        CounterVec::new(
            Opts::new(name("plan_changes_total"), "Total number of DNS record changes applied by change kind"),
            &["change"],
        )
        .unwrap(),
    )
});

pub static REGISTERED_WATCHES: LazyLock<IntGauge> = LazyLock::new(|| {
    registered(
        IntGauge::new(
            name("registered_watches"),
            "Number of source kinds with a dynamically installed watch",
        )
        .unwrap(),
    )
});

/// Failed reconciles by resource type and the label of the failing step's error.
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    registered(
        CounterVec::new(
            Opts::new(name("errors_total"), "Total number of errors by resource type and error category"),
            &["resource_type", "error_type"],
        )
        .unwrap(),
    )
});

/// Result of one reconcile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
}

impl Outcome {
    fn label(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Error => "error",
        }
    }
}

pub fn record_reconciliation(resource_type: &str, outcome: Outcome, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, outcome.label()])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record applied plan changes of one kind. Zero counts are ignored.
pub fn record_plan_changes(change: &str, count: usize) {
    if count > 0 {
        PLAN_CHANGES_TOTAL
            .with_label_values(&[change])
            .inc_by(count as f64);
    }
}

pub fn set_registered_watches(count: usize) {
    REGISTERED_WATCHES.set(i64::try_from(count).unwrap_or(i64::MAX));
}

pub fn record_error(resource_type: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_type])
        .inc();
}

/// Encode every registered metric in Prometheus text format.
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&METRICS_REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod metrics_tests;
