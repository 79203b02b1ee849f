// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for `ExternalDNS` resources.
//!
//! Conditions follow the usual Kubernetes shape:
//! - `type`: the reconcile stage being reported (`WatcherRegistered`,
//!   `CredentialConfigured`, `PlanApplied`)
//! - `status`: `"True"` or `"False"`
//! - `reason`: a programmatic identifier (CamelCase)
//! - `message`: a human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp of the last status flip
//!
//! All helpers here are in-memory. Persisting goes through
//! [`ExternalDnsApi::patch_status`](super::api::ExternalDnsApi::patch_status),
//! which uses [`mutate_status`] to decide whether a write is needed at all.
//!
//! # Example
//!
//! ```rust
//! use extdns::crd::ExternalDNSStatus;
//! use extdns::reconcilers::status::set_condition;
//!
//! let mut status = ExternalDNSStatus::default();
//! set_condition(&mut status.conditions, "PlanApplied", false, "PlanFailed", "boom", Some(1));
//! set_condition(&mut status.conditions, "PlanApplied", true, "UpToDate", "ok", Some(1));
//! assert_eq!(status.conditions.len(), 1);
//! assert_eq!(status.conditions[0].status, "True");
//! ```

use super::api::StatusMutation;
use crate::constants::{CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE};
use crate::crd::{Condition, ExternalDNSStatus};
use chrono::Utc;

/// Create a condition stamped with the current time.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: bool,
    reason: &str,
    message: &str,
    observed_generation: Option<i64>,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status_str(status).to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        observed_generation,
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type.
#[must_use]
pub fn find_condition<'a>(conditions: &'a [Condition], condition_type: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Whether the condition of `condition_type` is present and `"True"`.
#[must_use]
pub fn is_condition_true(conditions: &[Condition], condition_type: &str) -> bool {
    find_condition(conditions, condition_type).is_some_and(|c| c.status == CONDITION_STATUS_TRUE)
}

/// Update or add a condition in place.
///
/// There is at most one entry per type. `lastTransitionTime` is kept when
/// the status value does not change, and reset to now when it does.
pub fn set_condition(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: bool,
    reason: &str,
    message: &str,
    observed_generation: Option<i64>,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let status = status_str(status);
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.observed_generation = observed_generation;
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(
            condition_type,
            status,
            reason,
            message,
            observed_generation,
        ));
    }
}

/// Compare two condition lists, ignoring `lastTransitionTime` and order.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        find_condition(current, &new_cond.r#type).is_some_and(|curr| {
            curr.status == new_cond.status
                && curr.reason == new_cond.reason
                && curr.message == new_cond.message
                && curr.observed_generation == new_cond.observed_generation
        })
    })
}

/// Semantic equality of two statuses; timestamps are ignored.
#[must_use]
pub fn status_equal(current: &ExternalDNSStatus, new: &ExternalDNSStatus) -> bool {
    current.phase == new.phase
        && current.observed_generation == new.observed_generation
        && current.dns_records == new.dns_records
        && conditions_equal(&current.conditions, &new.conditions)
}

/// Apply `mutation` to a copy of `current`.
///
/// Returns `None` when the result is semantically equal to an existing
/// status, meaning no write is needed.
#[must_use]
pub fn mutate_status(
    current: Option<&ExternalDNSStatus>,
    mutation: StatusMutation<'_>,
) -> Option<ExternalDNSStatus> {
    let mut updated = current.cloned().unwrap_or_default();
    mutation(&mut updated);
    match current {
        Some(existing) if status_equal(existing, &updated) => None,
        _ => Some(updated),
    }
}

fn status_str(status: bool) -> &'static str {
    if status {
        CONDITION_STATUS_TRUE
    } else {
        CONDITION_STATUS_FALSE
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
