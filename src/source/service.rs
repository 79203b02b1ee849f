// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service source.
//!
//! LoadBalancer services publish their ingress IPs (A/AAAA) or hostnames
//! (CNAME). ClusterIP services publish the cluster IP, ExternalName services
//! their external name. Headless and NodePort services produce nothing.

use super::{annotation_hostnames, endpoints_for, template_hostnames, ttl_for};
use crate::crd::SourceSpec;
use crate::endpoint::Endpoint;
use k8s_openapi::api::core::v1::Service;

const TYPE_CLUSTER_IP: &str = "ClusterIP";
const TYPE_LOAD_BALANCER: &str = "LoadBalancer";
const TYPE_EXTERNAL_NAME: &str = "ExternalName";

/// Endpoints for a service, honoring `serviceTypeFilter`.
#[must_use]
pub fn endpoints(service: &Service, source: &SourceSpec, default_ttl: Option<i64>) -> Vec<Endpoint> {
    let name = service.metadata.name.as_deref().unwrap_or_default();
    let namespace = service.metadata.namespace.as_deref().unwrap_or_default();
    let spec = service.spec.as_ref();
    let service_type = spec
        .and_then(|s| s.type_.as_deref())
        .unwrap_or(TYPE_CLUSTER_IP);

    if !source.service_type_filter.is_empty()
        && !source.service_type_filter.iter().any(|t| t == service_type)
    {
        return Vec::new();
    }

    let mut hostnames = annotation_hostnames(&service.metadata);
    if hostnames.is_empty() {
        hostnames = template_hostnames(source, name, namespace);
    }
    if hostnames.is_empty() {
        return Vec::new();
    }

    let targets: Vec<String> = match service_type {
        TYPE_LOAD_BALANCER => service
            .status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .map(|ingress| {
                ingress
                    .iter()
                    .filter_map(|i| i.ip.clone().or_else(|| i.hostname.clone()))
                    .collect()
            })
            .unwrap_or_default(),
        TYPE_CLUSTER_IP => spec
            .and_then(|s| s.cluster_ip.clone())
            .filter(|ip| !ip.is_empty() && ip != "None")
            .into_iter()
            .collect(),
        TYPE_EXTERNAL_NAME => spec
            .and_then(|s| s.external_name.clone())
            .into_iter()
            .collect(),
        _ => Vec::new(),
    };

    endpoints_for(
        &hostnames,
        &targets,
        ttl_for(&service.metadata, default_ttl),
        &format!("service/{namespace}/{name}"),
    )
}
