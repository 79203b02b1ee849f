// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ingress source: every rule host, plus annotated hostnames, pointing at
//! the ingress load balancer.

use super::{annotation_hostnames, endpoints_for, template_hostnames, ttl_for};
use crate::crd::SourceSpec;
use crate::endpoint::Endpoint;
use k8s_openapi::api::networking::v1::Ingress;

#[must_use]
pub fn endpoints(ingress: &Ingress, source: &SourceSpec, default_ttl: Option<i64>) -> Vec<Endpoint> {
    let name = ingress.metadata.name.as_deref().unwrap_or_default();
    let namespace = ingress.metadata.namespace.as_deref().unwrap_or_default();

    let mut hostnames: Vec<String> = ingress
        .spec
        .as_ref()
        .and_then(|s| s.rules.as_ref())
        .map(|rules| {
            rules
                .iter()
                .filter_map(|r| r.host.clone())
                .filter(|h| !h.is_empty() && !h.starts_with('*'))
                .collect()
        })
        .unwrap_or_default();
    hostnames.extend(annotation_hostnames(&ingress.metadata));
    if hostnames.is_empty() {
        hostnames = template_hostnames(source, name, namespace);
    }
    hostnames.sort();
    hostnames.dedup();

    let targets: Vec<String> = ingress
        .status
        .as_ref()
        .and_then(|s| s.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .map(|lbs| {
            lbs.iter()
                .filter_map(|i| i.ip.clone().or_else(|| i.hostname.clone()))
                .collect()
        })
        .unwrap_or_default();

    endpoints_for(
        &hostnames,
        &targets,
        ttl_for(&ingress.metadata, default_ttl),
        &format!("ingress/{namespace}/{name}"),
    )
}
