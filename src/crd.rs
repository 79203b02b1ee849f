// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for the `ExternalDNS` resource.
//!
//! An `ExternalDNS` object describes the desired DNS state for one zone:
//! which provider hosts the zone, which cluster objects produce records,
//! and which synchronization policy constrains the changes the controller
//! may make.
//!
//! # Example
//!
//! ```yaml
//! apiVersion: extdns.firestoned.io/v1alpha1
//! kind: ExternalDNS
//! metadata:
//!   name: example-com
//!   namespace: dns-system
//! spec:
//!   domain: example.com
//!   provider: cloudflare
//!   policy: upsert-only
//!   registry: txt
//!   txtOwnerId: prod-cluster
//!   providerSecretRef:
//!     name: cloudflare-token
//!   source:
//!     kind: Service
//!     serviceTypeFilter: [LoadBalancer]
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Synchronization policy constraining which changes a plan may contain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Policy {
    /// Create, update and delete records.
    #[default]
    #[serde(rename = "sync")]
    Sync,
    /// Create and update records, never delete.
    #[serde(rename = "upsert-only")]
    UpsertOnly,
    /// Only create records that do not exist yet.
    #[serde(rename = "create-only")]
    CreateOnly,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Sync => write!(f, "sync"),
            Policy::UpsertOnly => write!(f, "upsert-only"),
            Policy::CreateOnly => write!(f, "create-only"),
        }
    }
}

/// Ownership registry used to tell managed records apart from foreign ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    /// TXT-record based ownership markers.
    #[default]
    Txt,
    /// No ownership tracking; every record in the zone is considered managed.
    Noop,
}

/// Kind of cluster object that produces desired DNS records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum SourceKind {
    Node,
    Service,
    Ingress,
}

impl SourceKind {
    /// API group of the kind, empty for the core group.
    #[must_use]
    pub fn group(&self) -> &'static str {
        match self {
            SourceKind::Node | SourceKind::Service => "",
            SourceKind::Ingress => "networking.k8s.io",
        }
    }

    /// Kind name as served by the API server.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SourceKind::Node => "Node",
            SourceKind::Service => "Service",
            SourceKind::Ingress => "Ingress",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Reference to a Secret in the same namespace as the `ExternalDNS` object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SecretRef {
    /// Name of the Secret.
    pub name: String,
}

/// Which cluster objects feed the desired record set, and how they are filtered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpec {
    /// Object kind to watch: Node, Service or Ingress.
    pub kind: SourceKind,

    /// Restrict namespaced kinds to one namespace. Ignored for Nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Kubernetes label selector (e.g. `app=web,tier!=cache`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_filter: Option<String>,

    /// Annotation equality filter in `key=value` form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_filter: Option<String>,

    /// Hostname template; `{{name}}` and `{{namespace}}` are substituted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn_template: Option<String>,

    /// Service types to consider (e.g. `LoadBalancer`). Empty means all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_type_filter: Vec<String>,
}

/// `ExternalDNS` drives one DNS zone on an external provider toward the
/// records produced by a cluster source.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "extdns.firestoned.io",
    version = "v1alpha1",
    kind = "ExternalDNS",
    shortname = "edns",
    plural = "externaldnses",
    namespaced,
    doc = "ExternalDNS synchronizes DNS records derived from cluster objects into an external DNS provider zone.",
    printcolumn = r#"{"name":"Domain","type":"string","jsonPath":".spec.domain"}"#,
    printcolumn = r#"{"name":"Provider","type":"string","jsonPath":".spec.provider"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#
)]
#[kube(status = "ExternalDNSStatus")]
#[serde(rename_all = "camelCase")]
pub struct ExternalDNSSpec {
    /// Zone apex managed by this resource (e.g. `example.com`).
    pub domain: String,

    /// Provider hosting the zone: aws, azure, google, cloudflare, digitalocean,
    /// inmemory or webhook.
    pub provider: String,

    /// Synchronization policy. Defaults to `sync`.
    #[serde(default)]
    pub policy: Policy,

    /// Provider zone identifier, added to the zone id filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,

    /// Ownership registry. Defaults to `txt`.
    #[serde(default)]
    pub registry: RegistryKind,

    /// Owner id written into TXT ownership markers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txt_owner_id: Option<String>,

    /// Prefix prepended to TXT ownership marker names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txt_prefix: Option<String>,

    /// Secret holding provider credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_secret_ref: Option<SecretRef>,

    /// Endpoint of a provider webhook (required for the `webhook` provider).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Source of desired records.
    pub source: SourceSpec,

    /// Only manage records under these domains.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_filter: Vec<String>,

    /// Never manage records under these domains.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_domains: Vec<String>,

    /// Regular expression domain filter. Takes precedence over the literal lists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_domain_filter: Option<String>,

    /// Regular expression exclusion, only used together with `regexDomainFilter`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_domain_exclusion: Option<String>,

    /// Only manage zones with these provider ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zone_id_filter: Vec<String>,

    /// Record types the controller may touch. Defaults to A, AAAA and CNAME.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managed_dns_record_types: Vec<String>,

    /// TTL applied to records whose source does not set one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 2_147_483_647))]
    pub default_ttl: Option<i64>,
}

/// Reconciliation phase of an `ExternalDNS` object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Phase {
    /// Never observed by the controller.
    #[default]
    #[serde(rename = "")]
    Unset,
    InProgress,
    Current,
    Failed,
}

impl Phase {
    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self, Phase::Unset)
    }
}

/// Condition represents an observation of one stage of reconciliation.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Stage this condition describes: WatcherRegistered, CredentialConfigured or PlanApplied.
    pub r#type: String,

    /// Status of the condition: True or False.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Generation of the spec this condition was computed from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// A DNS record the controller last applied to the provider.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DnsRecordStatus {
    pub dns_name: String,
    pub record_type: String,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

/// `ExternalDNS` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDNSStatus {
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub dns_records: Vec<DnsRecordStatus>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
