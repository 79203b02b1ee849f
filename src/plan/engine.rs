// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Plan application.
//!
//! [`PlanEngine::compute_and_apply`] runs in two stages:
//!
//! 1. **Missing records**: records the registry reports as absent are created
//!    first, in a change set of their own.
//! 2. **Sync**: the general diff is computed against the current state as it
//!    stands after stage 1 and applied through the registry.
//!
//! A stage whose change set is empty makes no provider call. A provider error
//! aborts the whole operation and is returned with the stage that failed.

use super::domain_filter::DomainFilter;
use super::{managed_record_types, Changes, Plan};
use crate::crd::{ExternalDNSSpec, Policy};
use crate::endpoint::{Endpoint, EndpointKey, RecordType};
use crate::errors::{PlanError, PlanStage};
use crate::labels::LABEL_OWNER;
use crate::metrics;
use crate::registry::{is_marker, Registry};
use std::collections::HashSet;
use tracing::{debug, info};

/// Everything one plan needs.
#[derive(Clone, Debug)]
pub struct PlanInput {
    pub policy: Policy,
    pub domain_filter: DomainFilter,
    pub managed_types: Vec<RecordType>,
    pub current: Vec<Endpoint>,
    pub desired: Vec<Endpoint>,
    pub missing: Vec<Endpoint>,
}

impl PlanInput {
    /// Build the plan input for a resource from already-fetched record sets.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] if the domain filter or managed record types are invalid.
    pub fn from_spec(
        spec: &ExternalDNSSpec,
        current: Vec<Endpoint>,
        desired: Vec<Endpoint>,
        missing: Vec<Endpoint>,
    ) -> Result<Self, PlanError> {
        Ok(Self {
            policy: spec.policy,
            domain_filter: DomainFilter::from_spec(spec)?,
            managed_types: managed_record_types(spec)?,
            current,
            desired,
            missing,
        })
    }
}

/// Result of a successful plan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlanOutcome {
    /// Desired records in scope of the plan, sorted by key.
    pub records: Vec<Endpoint>,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl PlanOutcome {
    /// True when neither stage wrote anything to the provider.
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.deleted == 0
    }
}

/// Computes and applies plans through a registry.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlanEngine;

impl PlanEngine {
    /// Read current state from the registry and drive it toward `desired`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] naming the stage that failed.
    pub async fn sync(
        &self,
        registry: &dyn Registry,
        spec: &ExternalDNSSpec,
        desired: Vec<Endpoint>,
    ) -> Result<PlanOutcome, PlanError> {
        let desired = registry
            .adjust_endpoints(desired)
            .await
            .map_err(|source| PlanError::Provider {
                stage: PlanStage::Source,
                source,
            })?;
        let current = registry
            .records()
            .await
            .map_err(|source| PlanError::Provider {
                stage: PlanStage::Records,
                source,
            })?;
        let missing = registry.missing_records();

        self.compute_and_apply(
            registry,
            PlanInput::from_spec(spec, current, desired, missing)?,
        )
        .await
    }

    /// Apply the missing-records stage, then the general sync stage.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Provider`] with the failing stage; the provider
    /// error itself is passed through uninterpreted.
    pub async fn compute_and_apply(
        &self,
        registry: &dyn Registry,
        input: PlanInput,
    ) -> Result<PlanOutcome, PlanError> {
        let PlanInput {
            policy,
            domain_filter,
            managed_types,
            mut current,
            desired,
            missing,
        } = input;
        let owner_id = registry.owner_id().map(str::to_string);
        let mut outcome = PlanOutcome::default();

        let present: HashSet<EndpointKey> = current.iter().map(Endpoint::key).collect();
        let missing: Vec<Endpoint> = missing
            .into_iter()
            .filter(|ep| domain_filter.matches(&ep.dns_name) && !present.contains(&ep.key()))
            .collect();

        if !missing.is_empty() {
            let changes = policy.apply(Changes::creates(missing));
            debug!(create = changes.create.len(), "Applying missing records");
            registry
                .apply_changes(&changes)
                .await
                .map_err(|source| PlanError::Provider {
                    stage: PlanStage::MissingRecords,
                    source,
                })?;
            metrics::record_plan_changes("create", changes.create.len());
            outcome.created += changes.create.len();

            // Markers stay invisible to the diff, as they are in `Registry::records`.
            current.extend(
                changes
                    .create
                    .into_iter()
                    .filter(|ep| !is_marker(ep))
                    .map(|ep| match &owner_id {
                        Some(owner) => ep.with_label(LABEL_OWNER, owner),
                        None => ep,
                    }),
            );
        }

        let plan = Plan {
            policy,
            current,
            desired,
            domain_filter,
            managed_types,
            owner_id,
        };
        let changes = plan.calculate(&|name: &str, current: &str, desired: &str| {
            registry.property_values_equal(name, current, desired)
        });
        outcome.records = plan.desired_records();

        if changes.is_empty() {
            debug!(policy = %policy, "No changes to apply");
        } else {
            registry
                .apply_changes(&changes)
                .await
                .map_err(|source| PlanError::Provider {
                    stage: PlanStage::Sync,
                    source,
                })?;
            metrics::record_plan_changes("create", changes.create.len());
            metrics::record_plan_changes("update", changes.update_new.len());
            metrics::record_plan_changes("delete", changes.delete.len());
            outcome.created += changes.create.len();
            outcome.updated += changes.update_new.len();
            outcome.deleted += changes.delete.len();
        }

        info!(
            policy = %policy,
            created = outcome.created,
            updated = outcome.updated,
            deleted = outcome.deleted,
            records = outcome.records.len(),
            "Plan complete"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod engine_tests;
