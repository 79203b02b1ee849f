// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS endpoint model shared by sources, registries, providers and the planner.
//!
//! An [`Endpoint`] is one DNS record set: a name, a type and the set of
//! targets it resolves to. Targets are compared as a set so that provider
//! ordering never shows up as a spurious change.

use crate::crd::DnsRecordStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// DNS record types understood by the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    A,
    AAAA,
    CNAME,
    TXT,
    MX,
    NS,
    SRV,
}

impl RecordType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
            RecordType::CNAME => "CNAME",
            RecordType::TXT => "TXT",
            RecordType::MX => "MX",
            RecordType::NS => "NS",
            RecordType::SRV => "SRV",
        }
    }

    /// Record type for an address target: A for IPv4, AAAA for IPv6, CNAME otherwise.
    #[must_use]
    pub fn for_target(target: &str) -> Self {
        match target.parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => RecordType::A,
            Ok(IpAddr::V6(_)) => RecordType::AAAA,
            Err(_) => RecordType::CNAME,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::AAAA),
            "CNAME" => Ok(RecordType::CNAME),
            "TXT" => Ok(RecordType::TXT),
            "MX" => Ok(RecordType::MX),
            "NS" => Ok(RecordType::NS),
            "SRV" => Ok(RecordType::SRV),
            other => Err(format!("unsupported record type '{other}'")),
        }
    }
}

/// One provider-specific property attached to an endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpecificProperty {
    pub name: String,
    pub value: String,
}

/// A DNS record set.
///
/// The serialized form matches the external-dns webhook wire format so that
/// webhook providers can consume it directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub dns_name: String,
    pub record_type: RecordType,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(rename = "recordTTL", default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provider_specific: Vec<ProviderSpecificProperty>,
}

impl Endpoint {
    /// Build an endpoint with no TTL, labels or provider-specific properties.
    #[must_use]
    pub fn new(dns_name: &str, record_type: RecordType, targets: Vec<String>) -> Self {
        Self {
            dns_name: normalize_name(dns_name),
            record_type,
            targets,
            ttl: None,
            set_identifier: None,
            labels: BTreeMap::new(),
            provider_specific: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Option<i64>) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    /// Identity of the record set within a zone: (name, type, set identifier).
    #[must_use]
    pub fn key(&self) -> EndpointKey {
        EndpointKey {
            dns_name: normalize_name(&self.dns_name),
            record_type: self.record_type,
            set_identifier: self.set_identifier.clone().unwrap_or_default(),
        }
    }

    /// Whether the two endpoints resolve to the same set of targets.
    #[must_use]
    pub fn same_targets(&self, other: &Endpoint) -> bool {
        normalized_targets(&self.targets) == normalized_targets(&other.targets)
    }

    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn provider_specific_value(&self, name: &str) -> Option<&str> {
        self.provider_specific
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}]",
            self.record_type,
            self.dns_name,
            self.targets.join(",")
        )
    }
}

impl From<&Endpoint> for DnsRecordStatus {
    fn from(endpoint: &Endpoint) -> Self {
        let mut targets = endpoint.targets.clone();
        targets.sort();
        DnsRecordStatus {
            dns_name: endpoint.dns_name.clone(),
            record_type: endpoint.record_type.to_string(),
            targets,
            ttl: endpoint.ttl,
        }
    }
}

/// Identity of a record set within a zone.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    pub dns_name: String,
    pub record_type: RecordType,
    pub set_identifier: String,
}

/// Lower-case a DNS name and strip the trailing root dot.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn normalized_targets(targets: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = targets.iter().map(|t| normalize_name(t)).collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

/// Merge endpoints that share a key, unioning their targets.
///
/// The first endpoint seen for a key keeps its TTL and labels.
#[must_use]
pub fn merge_endpoints(endpoints: Vec<Endpoint>) -> Vec<Endpoint> {
    let mut merged: BTreeMap<EndpointKey, Endpoint> = BTreeMap::new();
    for endpoint in endpoints {
        match merged.get_mut(&endpoint.key()) {
            Some(existing) => {
                for target in endpoint.targets {
                    if !existing.targets.contains(&target) {
                        existing.targets.push(target);
                    }
                }
            }
            None => {
                merged.insert(endpoint.key(), endpoint);
            }
        }
    }
    merged.into_values().collect()
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod endpoint_tests;
