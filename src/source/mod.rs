// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Sources of desired DNS records.
//!
//! A [`Source`] turns cluster objects of the kind named in
//! `spec.source.kind` into desired [`Endpoint`]s. The conversions for each
//! kind live in their own module and are pure functions of the object, so
//! [`KubeSource`] only lists objects and hands them over.
//!
//! Hostnames come from the `external-dns.alpha.kubernetes.io/hostname`
//! annotation, from `fqdnTemplate`, or (Ingress) from the rules. The
//! `external-dns.alpha.kubernetes.io/ttl` annotation overrides `defaultTtl`.

pub mod ingress;
pub mod node;
pub mod service;

use crate::constants::{ANNOTATION_HOSTNAME, ANNOTATION_TTL};
use crate::crd::{ExternalDNSSpec, SourceKind, SourceSpec};
use crate::endpoint::{merge_endpoints, Endpoint, RecordType};
use crate::errors::PlanError;
use crate::labels::LABEL_RESOURCE;
use crate::reconcilers::retry::retry_api_call;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, ListParams};
use kube::Client;
use std::collections::BTreeMap;
use tracing::debug;

/// Producer of desired endpoints for a resource.
#[async_trait]
pub trait Source: Send + Sync {
    /// Desired endpoints for `spec`, merged by (name, type, set identifier).
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Source`] if the objects cannot be listed.
    async fn endpoints(&self, spec: &ExternalDNSSpec) -> Result<Vec<Endpoint>, PlanError>;
}

/// Source listing Nodes, Services or Ingresses from the API server.
#[derive(Clone)]
pub struct KubeSource {
    client: Client,
}

impl KubeSource {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn list_params(source: &SourceSpec) -> ListParams {
        match source.label_filter.as_deref().filter(|l| !l.is_empty()) {
            Some(selector) => ListParams::default().labels(selector),
            None => ListParams::default(),
        }
    }

    fn api<K>(&self, source: &SourceSpec) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + serde::de::DeserializeOwned
            + std::fmt::Debug,
        K::DynamicType: Default,
    {
        match source.namespace.as_deref().filter(|n| !n.is_empty()) {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }
}

#[async_trait]
impl Source for KubeSource {
    async fn endpoints(&self, spec: &ExternalDNSSpec) -> Result<Vec<Endpoint>, PlanError> {
        let source = &spec.source;
        let params = Self::list_params(source);
        let list_failed = |e: anyhow::Error| PlanError::Source(format!("listing {}: {e}", source.kind));

        let endpoints: Vec<Endpoint> = match source.kind {
            SourceKind::Node => {
                let api: Api<Node> = Api::all(self.client.clone());
                let nodes = retry_api_call(|| api.list(&params), "list nodes")
                    .await
                    .map_err(list_failed)?;
                nodes
                    .items
                    .iter()
                    .filter(|n| annotation_filter_matches(&n.metadata, source))
                    .flat_map(|n| node::endpoints(n, source, spec.default_ttl))
                    .collect()
            }
            SourceKind::Service => {
                let api: Api<Service> = self.api(source);
                let services = retry_api_call(|| api.list(&params), "list services")
                    .await
                    .map_err(list_failed)?;
                services
                    .items
                    .iter()
                    .filter(|s| annotation_filter_matches(&s.metadata, source))
                    .flat_map(|s| service::endpoints(s, source, spec.default_ttl))
                    .collect()
            }
            SourceKind::Ingress => {
                let api: Api<Ingress> = self.api(source);
                let ingresses = retry_api_call(|| api.list(&params), "list ingresses")
                    .await
                    .map_err(list_failed)?;
                ingresses
                    .items
                    .iter()
                    .filter(|i| annotation_filter_matches(&i.metadata, source))
                    .flat_map(|i| ingress::endpoints(i, source, spec.default_ttl))
                    .collect()
            }
        };

        let merged = merge_endpoints(endpoints);
        debug!(kind = %source.kind, endpoints = merged.len(), "Collected desired endpoints");
        Ok(merged)
    }
}

/// Whether the object's annotations satisfy the `key=value` annotation filter.
#[must_use]
pub fn annotation_filter_matches(meta: &ObjectMeta, source: &SourceSpec) -> bool {
    let Some(filter) = source.annotation_filter.as_deref().filter(|f| !f.trim().is_empty()) else {
        return true;
    };
    let annotations = meta.annotations.as_ref();
    filter.split(',').all(|clause| {
        let clause = clause.trim();
        match clause.split_once('=') {
            Some((key, value)) => annotations
                .and_then(|a| a.get(key.trim()))
                .is_some_and(|v| v == value.trim()),
            None => annotations.is_some_and(|a| a.contains_key(clause)),
        }
    })
}

/// Hostnames from the hostname annotation, comma separated.
#[must_use]
pub fn annotation_hostnames(meta: &ObjectMeta) -> Vec<String> {
    meta.annotations
        .as_ref()
        .and_then(|a| a.get(ANNOTATION_HOSTNAME))
        .map(|v| split_hostnames(v))
        .unwrap_or_default()
}

/// Render `fqdnTemplate` for an object. `{{name}}` and `{{namespace}}` are substituted.
#[must_use]
pub fn template_hostnames(source: &SourceSpec, name: &str, namespace: &str) -> Vec<String> {
    source
        .fqdn_template
        .as_deref()
        .map(|t| split_hostnames(&t.replace("{{name}}", name).replace("{{namespace}}", namespace)))
        .unwrap_or_default()
}

fn split_hostnames(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

/// TTL from the TTL annotation, falling back to `default_ttl`.
#[must_use]
pub fn ttl_for(meta: &ObjectMeta, default_ttl: Option<i64>) -> Option<i64> {
    meta.annotations
        .as_ref()
        .and_then(|a| a.get(ANNOTATION_TTL))
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|ttl| *ttl > 0)
        .or(default_ttl)
}

/// One endpoint per (hostname, record type), targets grouped by type.
#[must_use]
pub fn endpoints_for(
    hostnames: &[String],
    targets: &[String],
    ttl: Option<i64>,
    resource: &str,
) -> Vec<Endpoint> {
    let mut by_type: BTreeMap<RecordType, Vec<String>> = BTreeMap::new();
    for target in targets {
        by_type
            .entry(RecordType::for_target(target))
            .or_default()
            .push(target.clone());
    }

    hostnames
        .iter()
        .flat_map(|host| {
            by_type.iter().map(move |(record_type, targets)| {
                Endpoint::new(host, *record_type, targets.clone())
                    .with_ttl(ttl)
                    .with_label(LABEL_RESOURCE, resource)
            })
        })
        .collect()
}
