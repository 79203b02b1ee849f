// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Plan computation.
//!
//! A [`Plan`] diffs the records currently in a zone against the desired
//! records produced by a source and yields a [`Changes`] set. The diff is a
//! pure function of its inputs; nothing is cached across reconciles.
//!
//! Rules applied by [`Plan::calculate`]:
//!
//! - Both sides are restricted to the managed record types and the domain filter.
//! - TXT ownership markers on the current side are never diffed.
//! - A desired record with no current counterpart is created.
//! - A current record with no desired counterpart is deleted, if owned.
//! - A pair whose targets, TTL or provider-specific properties differ is
//!   updated, if owned. Property equality is decided by the registry's comparator.
//! - The policy then removes every change kind it does not permit.

pub mod domain_filter;
pub mod engine;
pub mod policy;

use crate::constants::DEFAULT_MANAGED_RECORD_TYPES;
use crate::crd::{ExternalDNSSpec, Policy};
use crate::endpoint::{merge_endpoints, Endpoint, EndpointKey, RecordType};
use crate::errors::PlanError;
use crate::labels::LABEL_OWNER;
use crate::registry::is_marker;
use domain_filter::DomainFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub use engine::{PlanEngine, PlanInput, PlanOutcome};

/// A change set. Serializes to the external-dns webhook wire format.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Changes {
    #[serde(default)]
    pub create: Vec<Endpoint>,
    #[serde(default)]
    pub update_old: Vec<Endpoint>,
    #[serde(default)]
    pub update_new: Vec<Endpoint>,
    #[serde(default)]
    pub delete: Vec<Endpoint>,
}

impl Changes {
    /// A change set made only of creations.
    #[must_use]
    pub fn creates(create: Vec<Endpoint>) -> Self {
        Self {
            create,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.create.is_empty()
            && self.update_old.is_empty()
            && self.update_new.is_empty()
            && self.delete.is_empty()
    }

    /// Number of changes, counting each update pair once.
    #[must_use]
    pub fn len(&self) -> usize {
        self.create.len() + self.update_new.len() + self.delete.len()
    }
}

/// Comparator deciding whether a provider-specific property value changed.
///
/// Arguments are `(name, current, desired)`.
pub type PropertyComparator<'a> = &'a (dyn Fn(&str, &str, &str) -> bool + Send + Sync);

/// Inputs to one diff.
#[derive(Clone, Debug)]
pub struct Plan {
    pub policy: Policy,
    pub current: Vec<Endpoint>,
    pub desired: Vec<Endpoint>,
    pub domain_filter: DomainFilter,
    pub managed_types: Vec<RecordType>,
    /// Owner id of this controller; `None` treats every current record as owned.
    pub owner_id: Option<String>,
}

impl Plan {
    /// Compute the policy-filtered change set.
    #[must_use]
    pub fn calculate(&self, property_values_equal: PropertyComparator<'_>) -> Changes {
        let current: BTreeMap<EndpointKey, &Endpoint> = self
            .current
            .iter()
            .filter(|ep| self.in_scope(ep) && !is_marker(ep))
            .map(|ep| (ep.key(), ep))
            .collect();
        let desired: BTreeMap<EndpointKey, Endpoint> = self
            .desired_records()
            .into_iter()
            .map(|ep| (ep.key(), ep))
            .collect();

        let mut changes = Changes::default();

        for (key, want) in &desired {
            match current.get(key) {
                None => changes.create.push(want.clone()),
                Some(have) => {
                    if !self.owns(have) {
                        debug!(record = %have, "Skipping record owned by another controller");
                        continue;
                    }
                    if needs_update(have, want, property_values_equal) {
                        let mut new = want.clone();
                        for (k, v) in &have.labels {
                            new.labels.entry(k.clone()).or_insert_with(|| v.clone());
                        }
                        changes.update_old.push((*have).clone());
                        changes.update_new.push(new);
                    }
                }
            }
        }

        for (key, have) in &current {
            if !desired.contains_key(key) && self.owns(have) {
                changes.delete.push((*have).clone());
            }
        }

        debug!(
            policy = %self.policy,
            create = changes.create.len(),
            update = changes.update_new.len(),
            delete = changes.delete.len(),
            "Calculated plan before policy"
        );

        self.policy.apply(changes)
    }

    /// Desired records merged by key, restricted to the plan's scope and sorted.
    #[must_use]
    pub fn desired_records(&self) -> Vec<Endpoint> {
        merge_endpoints(self.desired.clone())
            .into_iter()
            .filter(|ep| self.in_scope(ep))
            .collect()
    }

    fn in_scope(&self, endpoint: &Endpoint) -> bool {
        self.managed_types.contains(&endpoint.record_type)
            && self.domain_filter.matches(&endpoint.dns_name)
    }

    fn owns(&self, endpoint: &Endpoint) -> bool {
        match &self.owner_id {
            None => true,
            Some(owner) => endpoint.label(LABEL_OWNER) == Some(owner.as_str()),
        }
    }
}

fn needs_update(
    current: &Endpoint,
    desired: &Endpoint,
    property_values_equal: PropertyComparator<'_>,
) -> bool {
    if !current.same_targets(desired) {
        return true;
    }
    if desired.ttl.is_some() && desired.ttl != current.ttl {
        return true;
    }
    desired.provider_specific.iter().any(|prop| {
        let have = current.provider_specific_value(&prop.name).unwrap_or_default();
        !property_values_equal(&prop.name, have, &prop.value)
    })
}

/// Parse `managedDnsRecordTypes`, falling back to A, AAAA and CNAME.
///
/// # Errors
///
/// Returns [`PlanError::InvalidRecordType`] for an unknown type.
pub fn managed_record_types(spec: &ExternalDNSSpec) -> Result<Vec<RecordType>, PlanError> {
    let names: Vec<&str> = if spec.managed_dns_record_types.is_empty() {
        DEFAULT_MANAGED_RECORD_TYPES.to_vec()
    } else {
        spec.managed_dns_record_types.iter().map(String::as_str).collect()
    };
    names
        .into_iter()
        .map(|name| name.parse::<RecordType>().map_err(PlanError::InvalidRecordType))
        .collect()
}
