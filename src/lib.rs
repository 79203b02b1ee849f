// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # extdns - external DNS controller for Kubernetes
//!
//! extdns watches `ExternalDNS` custom resources and keeps the records of an
//! external DNS provider in line with the hostnames published by cluster
//! objects (Services, Ingresses and Nodes).
//!
//! ## Overview
//!
//! Each `ExternalDNS` resource names a source kind, a provider and a sync
//! policy. Reconciling one resource:
//!
//! 1. ensures a watch on the source kind exists (installed once per process)
//! 2. materializes provider credentials from the referenced Secret
//! 3. computes a plan from desired and current records and applies it
//! 4. records progress in status conditions and the resource phase
//!
//! ## Modules
//!
//! - [`crd`] - the `ExternalDNS` custom resource and its status
//! - [`endpoint`] - the DNS record model shared by sources, plans and providers
//! - [`source`] - desired records from Services, Ingresses and Nodes
//! - [`provider`] - DNS providers (in-memory and webhook)
//! - [`registry`] - record ownership on top of a provider
//! - [`plan`] - diffing desired against current records under a policy
//! - [`watch_registry`] - at-most-once installation of source watches
//! - [`credentials`] - provider credential files derived from Secrets
//! - [`reconcilers`] - the reconcile loop and status updates
//!
//! ## Example
//!
//! ```rust,no_run
//! use extdns::endpoint::{Endpoint, RecordType};
//!
//! let endpoint = Endpoint::new("Web.Example.COM.", RecordType::A, vec!["10.0.0.1".into()])
//!     .with_ttl(Some(300));
//! assert_eq!(endpoint.dns_name, "web.example.com");
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod credentials;
pub mod crd;
pub mod endpoint;
pub mod errors;
pub mod labels;
pub mod metrics;
pub mod plan;
pub mod provider;
pub mod reconcilers;
pub mod registry;
pub mod server;
pub mod source;
pub mod status_reasons;
pub mod watch_registry;

#[cfg(test)]
pub(crate) mod test_support;
