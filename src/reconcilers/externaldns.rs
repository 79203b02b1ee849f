// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `ExternalDNS` reconciliation.
//!
//! One reconcile walks the resource through a fixed sequence of steps:
//!
//! 1. Load the live object. A missing object means it was deleted; nothing to do.
//! 2. Move an unset phase to `InProgress`.
//! 3. Ensure the source kind is watched (`WatcherRegistered`).
//! 4. Under the process-wide apply lock:
//!    - materialize provider credentials (`CredentialConfigured`)
//!    - compute and apply the plan (`PlanApplied`), then record the applied
//!      records, phase `Current` and the observed generation.
//!
//! A failing step sets its condition to `False`, moves the phase to `Failed`
//! with the observed generation, and returns the error so the controller
//! requeues with backoff. Every step runs against one deadline; running out of
//! time fails the current step.
//!
//! Status writes go through [`ExternalDnsApi::patch_status`]. A failed status
//! write is logged and never replaces the error of the step itself.

use super::api::StatusMutation;
use crate::constants::{
    CONDITION_CREDENTIAL_CONFIGURED, CONDITION_PLAN_APPLIED, CONDITION_WATCHER_REGISTERED,
    KIND_EXTERNAL_DNS,
};
use crate::context::Context;
use crate::credentials::{requires_secret, SecretData};
use crate::crd::{DnsRecordStatus, ExternalDNS, ExternalDNSSpec, ExternalDNSStatus, Phase};
use crate::errors::{CredentialError, ReconcileError};
use crate::metrics::{self, Outcome};
use crate::plan::PlanOutcome;
use crate::reconcilers::status::set_condition;
use crate::status_reasons::{
    plan_applied_message, MESSAGE_UP_TO_DATE, REASON_CREDENTIALS_CONFIGURED,
    REASON_CREDENTIALS_INVALID, REASON_PLAN_APPLIED, REASON_PLAN_FAILED, REASON_UP_TO_DATE,
    REASON_WATCH_FAILED, REASON_WATCH_REGISTERED,
};
use crate::watch_registry::GroupKind;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::Instant as Deadline;
use tracing::{debug, error, info, warn};

const STEP_WATCH: &str = "watch";
const STEP_CREDENTIALS: &str = "credentials";
const STEP_PLAN: &str = "plan";

/// Reconcile one `ExternalDNS` object.
///
/// # Errors
///
/// Returns the error of the first failing step.
pub async fn reconcile_externaldns(
    resource: Arc<ExternalDNS>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    let key = resource_key(&namespace, &name);
    let start = Instant::now();

    match reconcile(&ctx, &namespace, &name).await {
        Ok(()) => {
            metrics::record_reconciliation(KIND_EXTERNAL_DNS, Outcome::Success, start.elapsed());
            ctx.backoff.reset(&key);
            debug!(resource = %key, "Successfully reconciled ExternalDNS");
            Ok(Action::requeue(ctx.settings.resync_interval))
        }
        Err(e) => {
            metrics::record_reconciliation(KIND_EXTERNAL_DNS, Outcome::Error, start.elapsed());
            metrics::record_error(KIND_EXTERNAL_DNS, e.metric_label());
            error!(resource = %key, error = %e, "Failed to reconcile ExternalDNS");
            Err(e)
        }
    }
}

/// Requeue policy for failed reconciles: per-resource exponential backoff.
pub fn error_policy(resource: Arc<ExternalDNS>, error: &ReconcileError, ctx: Arc<Context>) -> Action {
    let key = resource_key(&resource.namespace().unwrap_or_default(), &resource.name_any());
    let delay = ctx.backoff.next_delay(&key);
    warn!(
        resource = %key,
        error = %error,
        retry_in = ?delay,
        failures = ctx.backoff.failures(&key),
        "Requeueing ExternalDNS after failure"
    );
    Action::requeue(delay)
}

/// Forget the error backoff of a resource that left the controller's store.
///
/// Deleted objects are never reconciled again, so their backoff entry would
/// otherwise live as long as the process.
pub fn forget_resource(ctx: &Context, namespace: Option<&str>, name: &str) {
    ctx.backoff.reset(&resource_key(namespace.unwrap_or_default(), name));
}

fn resource_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

async fn reconcile(ctx: &Context, namespace: &str, name: &str) -> Result<(), ReconcileError> {
    let Some(resource) = ctx.api.get(namespace, name).await? else {
        debug!(namespace, name, "ExternalDNS no longer exists, nothing to do");
        return Ok(());
    };

    let generation = resource.metadata.generation;
    let spec = resource.spec.clone();
    let deadline = Deadline::now() + ctx.settings.reconcile_timeout;
    let budget = ctx.settings.reconcile_timeout.as_secs();

    info!(
        namespace,
        name,
        provider = %spec.provider,
        policy = %spec.policy,
        source = %spec.source.kind,
        "Reconciling ExternalDNS"
    );

    if resource.status.as_ref().is_none_or(|s| s.phase.is_unset()) {
        persist(ctx, namespace, name, &|s: &mut ExternalDNSStatus| {
            if s.phase.is_unset() {
                s.phase = Phase::InProgress;
            }
        })
        .await;
    }

    // Source watch
    let kind = GroupKind::from(spec.source.kind);
    if let Err(e) = within(deadline, budget, STEP_WATCH, ctx.watches.watch(&kind)).await {
        fail(ctx, namespace, name, CONDITION_WATCHER_REGISTERED, REASON_WATCH_FAILED, &e, generation).await;
        return Err(e);
    }
    let message = format!("Watching {kind}");
    persist(ctx, namespace, name, &|s: &mut ExternalDNSStatus| {
        set_condition(
            &mut s.conditions,
            CONDITION_WATCHER_REGISTERED,
            true,
            REASON_WATCH_REGISTERED,
            &message,
            generation,
        );
    })
    .await;

    // Credentials, holding the apply lock until the plan is done
    let credentials = async {
        let guard = ctx.apply_lock.lock().await;
        provision_credentials(ctx, namespace, name, &spec).await?;
        Ok::<_, CredentialError>(guard)
    };
    let _guard = match within(deadline, budget, STEP_CREDENTIALS, credentials).await {
        Ok(guard) => guard,
        Err(e) => {
            fail(ctx, namespace, name, CONDITION_CREDENTIAL_CONFIGURED, REASON_CREDENTIALS_INVALID, &e, generation)
                .await;
            return Err(e);
        }
    };
    let message = format!("Credentials configured for provider {}", spec.provider);
    persist(ctx, namespace, name, &|s: &mut ExternalDNSStatus| {
        set_condition(
            &mut s.conditions,
            CONDITION_CREDENTIAL_CONFIGURED,
            true,
            REASON_CREDENTIALS_CONFIGURED,
            &message,
            generation,
        );
    })
    .await;

    // Plan
    let outcome = match within(deadline, budget, STEP_PLAN, apply_plan(ctx, &spec)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            fail(ctx, namespace, name, CONDITION_PLAN_APPLIED, REASON_PLAN_FAILED, &e, generation).await;
            return Err(e);
        }
    };

    let (reason, message) = if outcome.is_up_to_date() {
        (REASON_UP_TO_DATE, MESSAGE_UP_TO_DATE.to_string())
    } else {
        (
            REASON_PLAN_APPLIED,
            plan_applied_message(outcome.created, outcome.updated, outcome.deleted),
        )
    };
    let records: Vec<DnsRecordStatus> = outcome.records.iter().map(DnsRecordStatus::from).collect();
    persist(ctx, namespace, name, &|s: &mut ExternalDNSStatus| {
        s.dns_records.clone_from(&records);
        set_condition(&mut s.conditions, CONDITION_PLAN_APPLIED, true, reason, &message, generation);
        s.phase = Phase::Current;
        s.observed_generation = generation;
    })
    .await;

    info!(
        namespace,
        name,
        records = records.len(),
        created = outcome.created,
        updated = outcome.updated,
        deleted = outcome.deleted,
        "ExternalDNS is current"
    );
    Ok(())
}

async fn provision_credentials(
    ctx: &Context,
    namespace: &str,
    name: &str,
    spec: &ExternalDNSSpec,
) -> Result<(), CredentialError> {
    let secret = match spec.provider_secret_ref.as_ref().filter(|r| !r.name.is_empty()) {
        Some(secret_ref) => ctx
            .api
            .get_secret(namespace, &secret_ref.name)
            .await?
            .ok_or_else(|| CredentialError::SecretNotFound {
                namespace: namespace.to_string(),
                name: secret_ref.name.clone(),
            })?,
        None if requires_secret(&spec.provider) => {
            return Err(CredentialError::SecretRefMissing {
                provider: spec.provider.clone(),
            })
        }
        None => SecretData::new(),
    };

    ctx.credentials.set(&secret, namespace, name, &spec.provider).await
}

async fn apply_plan(ctx: &Context, spec: &ExternalDNSSpec) -> Result<PlanOutcome, ReconcileError> {
    let registry = ctx.providers.registry(spec).await?;
    let desired = ctx.source.endpoints(spec).await?;
    Ok(ctx.engine.sync(registry.as_ref(), spec, desired).await?)
}

/// Run one step against the reconcile deadline.
async fn within<T, E>(
    deadline: Deadline,
    budget_secs: u64,
    step: &'static str,
    future: impl Future<Output = Result<T, E>>,
) -> Result<T, ReconcileError>
where
    E: Into<ReconcileError>,
{
    match tokio::time::timeout_at(deadline, future).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(ReconcileError::Timeout {
            step,
            seconds: budget_secs,
        }),
    }
}

/// Record a failed step: its condition goes `False`, the phase `Failed`, and
/// the attempt counts as having observed `generation`.
async fn fail(
    ctx: &Context,
    namespace: &str,
    name: &str,
    condition_type: &str,
    reason: &str,
    error: &ReconcileError,
    generation: Option<i64>,
) {
    let message = error.to_string();
    persist(ctx, namespace, name, &|s: &mut ExternalDNSStatus| {
        set_condition(&mut s.conditions, condition_type, false, reason, &message, generation);
        s.phase = Phase::Failed;
        s.observed_generation = generation;
    })
    .await;
}

async fn persist(ctx: &Context, namespace: &str, name: &str, mutation: StatusMutation<'_>) {
    if let Err(e) = ctx.api.patch_status(namespace, name, mutation).await {
        warn!(namespace, name, error = %e, "Failed to update ExternalDNS status");
    }
}

#[cfg(test)]
#[path = "externaldns_tests.rs"]
mod externaldns_tests;
