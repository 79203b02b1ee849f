// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for `ExternalDNS` resources.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why a condition has
//! a particular status.
//!
//! # Condition Types
//!
//! Each `ExternalDNS` object carries up to three conditions, one per reconcile stage:
//!
//! - `WatcherRegistered` - the source kind is being watched
//! - `CredentialConfigured` - provider credentials were materialized
//! - `PlanApplied` - the computed plan reached the provider
//!
//! A later stage only appears once the earlier ones succeeded.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   phase: Current
//!   observedGeneration: 4
//!   conditions:
//!     - type: WatcherRegistered
//!       status: "True"
//!       reason: WatchRegistered
//!       message: "Watching Service.core"
//!     - type: CredentialConfigured
//!       status: "True"
//!       reason: CredentialsConfigured
//!       message: "Credentials for provider cloudflare configured"
//!     - type: PlanApplied
//!       status: "True"
//!       reason: UpToDate
//!       message: "DNS records already up to date"
//! ```

// ============================================================================
// WatcherRegistered
// ============================================================================

/// The watch on the declared source kind is installed (or already was).
pub const REASON_WATCH_REGISTERED: &str = "WatchRegistered";

/// Installing the watch failed; it is retried on the next reconcile.
///
/// Common causes:
/// - The kind is not served by the API server
/// - The controller's RBAC does not allow list/watch on the kind
pub const REASON_WATCH_FAILED: &str = "WatchFailed";

// ============================================================================
// CredentialConfigured
// ============================================================================

/// Provider credentials were written to their file or environment variable.
pub const REASON_CREDENTIALS_CONFIGURED: &str = "CredentialsConfigured";

/// The secret is missing, lacks a required key, or could not be written.
pub const REASON_CREDENTIALS_INVALID: &str = "CredentialsInvalid";

// ============================================================================
// PlanApplied
// ============================================================================

/// Changes were computed and accepted by the provider.
pub const REASON_PLAN_APPLIED: &str = "PlanApplied";

/// The computed plan was empty; no provider write was made.
pub const REASON_UP_TO_DATE: &str = "UpToDate";

/// Reading provider state, computing the plan, or applying it failed.
pub const REASON_PLAN_FAILED: &str = "PlanFailed";

// ============================================================================
// Messages
// ============================================================================

/// `PlanApplied` message when nothing had to change.
pub const MESSAGE_UP_TO_DATE: &str = "DNS records already up to date";

/// Build the `PlanApplied` message for a non-empty change set.
#[must_use]
pub fn plan_applied_message(created: usize, updated: usize, deleted: usize) -> String {
    format!("Plan applied: {created} created, {updated} updated, {deleted} deleted")
}

#[cfg(test)]
#[path = "status_reasons_tests.rs"]
mod status_reasons_tests;
