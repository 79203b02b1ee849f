// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Node source: one record per node, pointing at its external addresses.

use super::{endpoints_for, template_hostnames, ttl_for};
use crate::crd::SourceSpec;
use crate::endpoint::Endpoint;
use k8s_openapi::api::core::v1::Node;

const ADDRESS_EXTERNAL_IP: &str = "ExternalIP";
const ADDRESS_INTERNAL_IP: &str = "InternalIP";

/// Endpoints for a node.
///
/// The hostname is the rendered `fqdnTemplate`, or the node name. Targets
/// are the ExternalIP addresses, or the InternalIP addresses when the node
/// has no external one.
#[must_use]
pub fn endpoints(node: &Node, source: &SourceSpec, default_ttl: Option<i64>) -> Vec<Endpoint> {
    let name = node.metadata.name.as_deref().unwrap_or_default();
    if name.is_empty() {
        return Vec::new();
    }

    let mut hostnames = template_hostnames(source, name, "");
    if hostnames.is_empty() {
        hostnames.push(name.to_string());
    }

    let addresses_of = |address_type: &str| -> Vec<String> {
        node.status
            .as_ref()
            .and_then(|s| s.addresses.as_ref())
            .map(|addrs| {
                addrs
                    .iter()
                    .filter(|a| a.type_ == address_type)
                    .map(|a| a.address.clone())
                    .collect()
            })
            .unwrap_or_default()
    };

    let mut targets = addresses_of(ADDRESS_EXTERNAL_IP);
    if targets.is_empty() {
        targets = addresses_of(ADDRESS_INTERNAL_IP);
    }

    endpoints_for(
        &hostnames,
        &targets,
        ttl_for(&node.metadata, default_ttl),
        &format!("node/{name}"),
    )
}
