// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ownership registries.
//!
//! A [`Registry`] wraps a [`Provider`] and decides which records in a zone
//! belong to this controller. Records it owns carry the `owner` endpoint
//! label; the planner only updates or deletes those.
//!
//! # TXT registry
//!
//! [`TxtRegistry`] keeps one ownership marker per managed record, stored as
//! a TXT record with the value
//!
//! ```text
//! "heritage=external-dns,external-dns/owner=<id>,external-dns/resource=<resource>"
//! ```
//!
//! Two marker names exist for every record: the legacy `<prefix><name>` and
//! the typed `<prefix><type>-<name>`. Records found with only a legacy
//! marker are reported through [`Registry::missing_records`] so that the
//! typed marker gets created before the main sync runs.

use crate::constants::{DEFAULT_TXT_OWNER_ID, TXT_HERITAGE};
use crate::endpoint::{normalize_name, Endpoint, RecordType};
use crate::errors::ProviderError;
use crate::labels::{LABEL_OWNER, LABEL_RESOURCE, TXT_KEY_HERITAGE, TXT_KEY_OWNER, TXT_KEY_RESOURCE};
use crate::plan::Changes;
use crate::provider::Provider;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Provider contract extended with ownership bookkeeping.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Current records, ownership-labelled, with bookkeeping records hidden.
    async fn records(&self) -> Result<Vec<Endpoint>, ProviderError>;

    /// Apply a change set, adding or removing bookkeeping records as needed.
    async fn apply_changes(&self, changes: &Changes) -> Result<(), ProviderError>;

    async fn adjust_endpoints(&self, endpoints: Vec<Endpoint>) -> Result<Vec<Endpoint>, ProviderError>;

    fn property_values_equal(&self, name: &str, current: &str, desired: &str) -> bool;

    /// Records that must exist but are absent, as of the last `records` call.
    fn missing_records(&self) -> Vec<Endpoint>;

    /// Owner id of this controller, or `None` when every record counts as owned.
    fn owner_id(&self) -> Option<&str>;
}

/// Registry without ownership tracking.
pub struct NoopRegistry {
    provider: Arc<dyn Provider>,
}

impl NoopRegistry {
    #[must_use]
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Registry for NoopRegistry {
    async fn records(&self) -> Result<Vec<Endpoint>, ProviderError> {
        self.provider.records().await
    }

    async fn apply_changes(&self, changes: &Changes) -> Result<(), ProviderError> {
        self.provider.apply_changes(changes).await
    }

    async fn adjust_endpoints(&self, endpoints: Vec<Endpoint>) -> Result<Vec<Endpoint>, ProviderError> {
        self.provider.adjust_endpoints(endpoints).await
    }

    fn property_values_equal(&self, name: &str, current: &str, desired: &str) -> bool {
        self.provider.property_values_equal(name, current, desired)
    }

    fn missing_records(&self) -> Vec<Endpoint> {
        Vec::new()
    }

    fn owner_id(&self) -> Option<&str> {
        None
    }
}

/// Registry tracking ownership with TXT marker records.
pub struct TxtRegistry {
    provider: Arc<dyn Provider>,
    owner_id: String,
    prefix: String,
    missing: Mutex<Vec<Endpoint>>,
    markers: Mutex<HashSet<String>>,
}

impl TxtRegistry {
    #[must_use]
    pub fn new(provider: Arc<dyn Provider>, owner_id: Option<&str>, prefix: Option<&str>) -> Self {
        Self {
            provider,
            owner_id: owner_id
                .filter(|o| !o.is_empty())
                .unwrap_or(DEFAULT_TXT_OWNER_ID)
                .to_string(),
            prefix: prefix.unwrap_or_default().to_ascii_lowercase(),
            missing: Mutex::new(Vec::new()),
            markers: Mutex::new(HashSet::new()),
        }
    }

    fn legacy_name(&self, ep: &Endpoint) -> String {
        format!("{}{}", self.prefix, ep.dns_name)
    }

    fn typed_name(&self, ep: &Endpoint) -> String {
        format!(
            "{}{}-{}",
            self.prefix,
            ep.record_type.as_str().to_ascii_lowercase(),
            ep.dns_name
        )
    }

    fn marker_value(&self, ep: &Endpoint) -> String {
        let mut value = format!(
            "{TXT_KEY_HERITAGE}={TXT_HERITAGE},{TXT_KEY_OWNER}={}",
            self.owner_id
        );
        if let Some(resource) = ep.label(LABEL_RESOURCE) {
            value.push_str(&format!(",{TXT_KEY_RESOURCE}={resource}"));
        }
        format!("\"{value}\"")
    }

    fn marker(&self, name: String, ep: &Endpoint) -> Endpoint {
        let mut marker = Endpoint::new(&name, RecordType::TXT, vec![self.marker_value(ep)]);
        marker.ttl = ep.ttl;
        marker.set_identifier = ep.set_identifier.clone();
        marker
    }

    /// Both markers for a record: legacy first, then typed.
    fn markers_for(&self, ep: &Endpoint) -> [Endpoint; 2] {
        [
            self.marker(self.legacy_name(ep), ep),
            self.marker(self.typed_name(ep), ep),
        ]
    }

    fn owned(&self, ep: &Endpoint) -> Endpoint {
        ep.clone().with_label(LABEL_OWNER, &self.owner_id)
    }

    fn known_markers(&self) -> HashSet<String> {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Parse a marker value into endpoint labels. `None` if it is not a marker.
pub(crate) fn parse_marker(value: &str) -> Option<BTreeMap<String, String>> {
    let value = value.trim().trim_matches('"');
    let mut labels = BTreeMap::new();
    let mut heritage = false;
    for pair in value.split(',') {
        let (key, val) = pair.split_once('=')?;
        match key.trim() {
            TXT_KEY_HERITAGE => heritage = val.trim() == TXT_HERITAGE,
            TXT_KEY_OWNER => {
                labels.insert(LABEL_OWNER.to_string(), val.trim().to_string());
            }
            TXT_KEY_RESOURCE => {
                labels.insert(LABEL_RESOURCE.to_string(), val.trim().to_string());
            }
            _ => {}
        }
    }
    heritage.then_some(labels)
}

/// Whether `ep` is a TXT ownership marker rather than a managed record.
pub(crate) fn is_marker(ep: &Endpoint) -> bool {
    ep.record_type == RecordType::TXT && ep.targets.iter().any(|t| parse_marker(t).is_some())
}

const MARKER_TYPES: [RecordType; 6] = [
    RecordType::AAAA,
    RecordType::CNAME,
    RecordType::A,
    RecordType::MX,
    RecordType::NS,
    RecordType::SRV,
];

#[async_trait]
impl Registry for TxtRegistry {
    async fn records(&self) -> Result<Vec<Endpoint>, ProviderError> {
        let all = self.provider.records().await?;

        let mut legacy: HashMap<(String, String), BTreeMap<String, String>> = HashMap::new();
        let mut typed: HashMap<(String, RecordType, String), BTreeMap<String, String>> = HashMap::new();
        let mut marker_names = HashSet::new();
        let mut records = Vec::new();

        for ep in all {
            let labels = if ep.record_type == RecordType::TXT {
                ep.targets.iter().find_map(|t| parse_marker(t))
            } else {
                None
            };
            let Some(labels) = labels else {
                records.push(ep);
                continue;
            };

            marker_names.insert(ep.dns_name.clone());
            let set_id = ep.set_identifier.clone().unwrap_or_default();
            let Some(name) = ep.dns_name.strip_prefix(self.prefix.as_str()) else {
                continue;
            };
            let name = normalize_name(name);
            for record_type in MARKER_TYPES {
                let tag = format!("{}-", record_type.as_str().to_ascii_lowercase());
                if let Some(target) = name.strip_prefix(&tag) {
                    typed.insert((target.to_string(), record_type, set_id.clone()), labels.clone());
                }
            }
            legacy.insert((name, set_id), labels);
        }

        let mut missing = Vec::new();
        for ep in &mut records {
            let set_id = ep.set_identifier.clone().unwrap_or_default();
            let typed_labels = typed.get(&(ep.dns_name.clone(), ep.record_type, set_id.clone()));
            let labels = typed_labels.or_else(|| legacy.get(&(ep.dns_name.clone(), set_id)));
            let Some(labels) = labels else {
                continue;
            };
            for (k, v) in labels {
                ep.labels.insert(k.clone(), v.clone());
            }
            if typed_labels.is_none() && ep.label(LABEL_OWNER) == Some(self.owner_id.as_str()) {
                let typed_marker = self.marker(self.typed_name(ep), ep);
                if !marker_names.contains(&typed_marker.dns_name) {
                    missing.push(typed_marker);
                }
            }
        }

        debug!(
            owner = %self.owner_id,
            records = records.len(),
            markers = marker_names.len(),
            missing = missing.len(),
            "Read records through TXT registry"
        );

        *self.missing.lock().unwrap_or_else(PoisonError::into_inner) = missing;
        *self.markers.lock().unwrap_or_else(PoisonError::into_inner) = marker_names;
        Ok(records)
    }

    async fn apply_changes(&self, changes: &Changes) -> Result<(), ProviderError> {
        let known = self.known_markers();
        let mut out = Changes::default();
        let mut created = HashSet::new();
        let mut deleted = HashSet::new();

        for ep in &changes.create {
            if is_marker(ep) {
                created.insert(ep.key());
                out.create.push(ep.clone());
                continue;
            }
            let ep = self.owned(ep);
            for marker in self.markers_for(&ep) {
                if !known.contains(&marker.dns_name) && created.insert(marker.key()) {
                    out.create.push(marker);
                }
            }
            out.create.push(ep);
        }

        out.update_old.extend(changes.update_old.iter().cloned());
        out.update_new
            .extend(changes.update_new.iter().map(|ep| self.owned(ep)));

        for ep in &changes.delete {
            if is_marker(ep) {
                deleted.insert(ep.key());
                out.delete.push(ep.clone());
                continue;
            }
            for marker in self.markers_for(ep) {
                if known.contains(&marker.dns_name) && deleted.insert(marker.key()) {
                    out.delete.push(marker);
                }
            }
            out.delete.push(ep.clone());
        }

        self.provider.apply_changes(&out).await?;

        let mut markers = self.markers.lock().unwrap_or_else(PoisonError::into_inner);
        for ep in out.create.iter().filter(|ep| is_marker(ep)) {
            markers.insert(ep.dns_name.clone());
        }
        for ep in out.delete.iter().filter(|ep| is_marker(ep)) {
            markers.remove(&ep.dns_name);
        }
        Ok(())
    }

    async fn adjust_endpoints(&self, endpoints: Vec<Endpoint>) -> Result<Vec<Endpoint>, ProviderError> {
        self.provider.adjust_endpoints(endpoints).await
    }

    fn property_values_equal(&self, name: &str, current: &str, desired: &str) -> bool {
        self.provider.property_values_equal(name, current, desired)
    }

    fn missing_records(&self) -> Vec<Endpoint> {
        self.missing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn owner_id(&self) -> Option<&str> {
        Some(&self.owner_id)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;
