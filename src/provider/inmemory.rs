// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Process-local DNS provider.
//!
//! Zones live in memory for the lifetime of the process. Change sets are
//! validated in full before any of them is applied, so a rejected change set
//! leaves the zone untouched.

use super::Provider;
use crate::endpoint::{normalize_name, Endpoint, EndpointKey};
use crate::errors::ProviderError;
use crate::plan::domain_filter::ZoneIdFilter;
use crate::plan::Changes;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Clone, Debug, Default)]
struct Zone {
    domain: String,
    records: BTreeMap<EndpointKey, Endpoint>,
}

/// In-memory provider holding any number of zones keyed by zone id.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    zones: RwLock<BTreeMap<String, Zone>>,
    zone_id_filter: ZoneIdFilter,
}

impl InMemoryProvider {
    /// Provider with a single empty zone.
    #[must_use]
    pub fn with_zone(zone_id: &str, domain: &str) -> Self {
        let mut zones = BTreeMap::new();
        zones.insert(
            zone_id.to_string(),
            Zone {
                domain: normalize_name(domain),
                records: BTreeMap::new(),
            },
        );
        Self {
            zones: RwLock::new(zones),
            zone_id_filter: ZoneIdFilter::default(),
        }
    }

    #[must_use]
    pub fn with_zone_id_filter(mut self, filter: ZoneIdFilter) -> Self {
        self.zone_id_filter = filter;
        self
    }

    /// Add an empty zone.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Conflict`] if the zone id already exists.
    pub async fn create_zone(&self, zone_id: &str, domain: &str) -> Result<(), ProviderError> {
        let mut zones = self.zones.write().await;
        if zones.contains_key(zone_id) {
            return Err(ProviderError::Conflict {
                record: zone_id.to_string(),
                reason: "zone already exists".to_string(),
            });
        }
        zones.insert(
            zone_id.to_string(),
            Zone {
                domain: normalize_name(domain),
                records: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Zone id owning `name`: the filtered zone with the longest matching domain.
    fn zone_for<'a>(&self, zones: &'a BTreeMap<String, Zone>, name: &str) -> Option<&'a str> {
        zones
            .iter()
            .filter(|(id, _)| self.zone_id_filter.matches(id))
            .filter(|(_, zone)| name == zone.domain || name.ends_with(&format!(".{}", zone.domain)))
            .max_by_key(|(_, zone)| zone.domain.len())
            .map(|(id, _)| id.as_str())
    }

    fn validate(&self, zones: &BTreeMap<String, Zone>, changes: &Changes) -> Result<(), ProviderError> {
        let mut touched: HashSet<EndpointKey> = HashSet::new();
        let mut check = |ep: &Endpoint, must_exist: bool| -> Result<(), ProviderError> {
            let conflict = |reason: &str| ProviderError::Conflict {
                record: format!("{} {}", ep.record_type, ep.dns_name),
                reason: reason.to_string(),
            };
            let zone_id = self
                .zone_for(zones, &ep.dns_name)
                .ok_or_else(|| conflict("no zone matches the record"))?;
            let exists = zones
                .get(zone_id)
                .is_some_and(|zone| zone.records.contains_key(&ep.key()));
            if must_exist && !exists {
                return Err(conflict("record does not exist"));
            }
            if !must_exist && exists {
                return Err(conflict("record already exists"));
            }
            if !touched.insert(ep.key()) {
                return Err(conflict("record appears twice in the change set"));
            }
            Ok(())
        };

        for ep in &changes.create {
            check(ep, false)?;
        }
        for ep in &changes.update_new {
            check(ep, true)?;
        }
        for ep in &changes.delete {
            check(ep, true)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Provider for InMemoryProvider {
    async fn records(&self) -> Result<Vec<Endpoint>, ProviderError> {
        let zones = self.zones.read().await;
        Ok(zones
            .iter()
            .filter(|(id, _)| self.zone_id_filter.matches(id))
            .flat_map(|(_, zone)| zone.records.values().cloned())
            .collect())
    }

    async fn apply_changes(&self, changes: &Changes) -> Result<(), ProviderError> {
        let mut zones = self.zones.write().await;
        self.validate(&zones, changes)?;

        for ep in changes.create.iter().chain(changes.update_new.iter()) {
            if let Some(zone_id) = self.zone_for(&zones, &ep.dns_name).map(str::to_string) {
                if let Some(zone) = zones.get_mut(&zone_id) {
                    zone.records.insert(ep.key(), ep.clone());
                }
            }
        }
        for ep in &changes.delete {
            if let Some(zone_id) = self.zone_for(&zones, &ep.dns_name).map(str::to_string) {
                if let Some(zone) = zones.get_mut(&zone_id) {
                    zone.records.remove(&ep.key());
                }
            }
        }

        debug!(
            create = changes.create.len(),
            update = changes.update_new.len(),
            delete = changes.delete.len(),
            "Applied changes to in-memory zones"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "inmemory_tests.rs"]
mod inmemory_tests;
