// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation for `ExternalDNS` resources.
//!
//! The controller follows the standard Kubernetes pattern:
//!
//! 1. **Watch** - `ExternalDNS` objects, plus the source kinds they reference
//! 2. **Reconcile** - drive the provider zone toward the records of the source
//! 3. **Status** - report every stage back as a condition on the resource
//!
//! # Modules
//!
//! - [`externaldns`] - the reconcile state machine and its error policy
//! - [`api`] - API server access, including conflict-retrying status patches
//! - [`status`] - in-memory condition helpers
//! - [`retry`] - exponential backoff for transient API and HTTP failures

pub mod api;
pub mod externaldns;
pub mod retry;
pub mod status;

pub use api::{ExternalDnsApi, KubeExternalDnsApi};
pub use externaldns::{error_policy, forget_resource, reconcile_externaldns};
