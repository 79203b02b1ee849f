// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-crate fakes and builders shared by the unit tests.

use crate::credentials::SecretData;
use crate::crd::{ExternalDNS, ExternalDNSSpec, ExternalDNSStatus, Policy, RegistryKind, SourceKind, SourceSpec};
use crate::endpoint::Endpoint;
use crate::errors::{CredentialError, PlanError, ProviderError, ReconcileError, WatchError};
use crate::plan::Changes;
use crate::provider::inmemory::InMemoryProvider;
use crate::provider::{Provider, ProviderFactory};
use crate::reconcilers::api::{ExternalDnsApi, StatusMutation};
use crate::reconcilers::status::mutate_status;
use crate::registry::{Registry, TxtRegistry};
use crate::source::Source;
use crate::watch_registry::{GroupKind, WatchSource};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Serializes tests that touch process environment variables.
pub(crate) static ENV_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

/// Minimal spec: Service source, sync policy, TXT registry.
pub(crate) fn spec(domain: &str, provider: &str) -> ExternalDNSSpec {
    ExternalDNSSpec {
        domain: domain.to_string(),
        provider: provider.to_string(),
        policy: Policy::Sync,
        zone: None,
        registry: RegistryKind::Txt,
        txt_owner_id: None,
        txt_prefix: None,
        provider_secret_ref: None,
        webhook_url: None,
        source: SourceSpec {
            kind: SourceKind::Service,
            namespace: None,
            label_filter: None,
            annotation_filter: None,
            fqdn_template: None,
            service_type_filter: Vec::new(),
        },
        domain_filter: Vec::new(),
        exclude_domains: Vec::new(),
        regex_domain_filter: None,
        regex_domain_exclusion: None,
        zone_id_filter: Vec::new(),
        managed_dns_record_types: Vec::new(),
        default_ttl: None,
    }
}

pub(crate) fn external_dns(namespace: &str, name: &str, kind: SourceKind) -> ExternalDNS {
    let mut s = spec("example.com", "inmemory");
    s.source.kind = kind;
    let mut resource = ExternalDNS::new(name, s);
    resource.metadata.namespace = Some(namespace.to_string());
    resource.metadata.generation = Some(1);
    resource
}

/// Registry that records every change set and reports no current records.
pub(crate) struct RecordingRegistry {
    applied: Mutex<Vec<Changes>>,
    calls: AtomicUsize,
    fail_after: Option<usize>,
}

impl RecordingRegistry {
    pub(crate) fn new() -> Self {
        Self {
            applied: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail_after: None,
        }
    }

    /// Registry whose apply calls fail once `successes` calls went through.
    pub(crate) fn failing_after(successes: usize) -> Self {
        Self {
            fail_after: Some(successes),
            ..Self::new()
        }
    }

    /// Successfully applied change sets, in order.
    pub(crate) fn applied(&self) -> Vec<Changes> {
        self.applied.lock().unwrap().clone()
    }
}

#[async_trait]
impl Registry for RecordingRegistry {
    async fn records(&self) -> Result<Vec<Endpoint>, ProviderError> {
        Ok(Vec::new())
    }

    async fn apply_changes(&self, changes: &Changes) -> Result<(), ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|n| call >= n) {
            return Err(ProviderError::ApplyChanges("injected failure".to_string()));
        }
        self.applied.lock().unwrap().push(changes.clone());
        Ok(())
    }

    async fn adjust_endpoints(&self, endpoints: Vec<Endpoint>) -> Result<Vec<Endpoint>, ProviderError> {
        Ok(endpoints)
    }

    fn property_values_equal(&self, _name: &str, current: &str, desired: &str) -> bool {
        current == desired
    }

    fn missing_records(&self) -> Vec<Endpoint> {
        Vec::new()
    }

    fn owner_id(&self) -> Option<&str> {
        None
    }
}

/// Watch source counting install attempts per kind.
#[derive(Default)]
pub(crate) struct FakeWatchSource {
    installs: Mutex<HashMap<String, usize>>,
    failures_left: AtomicUsize,
}

impl FakeWatchSource {
    pub(crate) fn failing_first(failures: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(failures),
            ..Self::default()
        }
    }

    pub(crate) fn installs(&self, kind: &GroupKind) -> usize {
        self.installs.lock().unwrap().get(&kind.key()).copied().unwrap_or(0)
    }
}

#[async_trait]
impl WatchSource for FakeWatchSource {
    async fn install(&self, kind: &GroupKind) -> Result<(), WatchError> {
        *self.installs.lock().unwrap().entry(kind.key()).or_insert(0) += 1;
        tokio::time::sleep(Duration::from_millis(5)).await;

        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(WatchError::InstallFailed {
                kind: kind.key(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

/// In-memory stand-in for the API server.
#[derive(Default)]
pub(crate) struct FakeExternalDnsApi {
    objects: Mutex<HashMap<(String, String), ExternalDNS>>,
    secrets: Mutex<HashMap<(String, String), SecretData>>,
    patches: AtomicUsize,
}

impl FakeExternalDnsApi {
    pub(crate) fn with_object(self, resource: ExternalDNS) -> Self {
        let key = (
            resource.metadata.namespace.clone().unwrap_or_default(),
            resource.metadata.name.clone().unwrap_or_default(),
        );
        self.objects.lock().unwrap().insert(key, resource);
        self
    }

    pub(crate) fn with_secret(self, namespace: &str, name: &str, data: SecretData) -> Self {
        self.secrets
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), data);
        self
    }

    pub(crate) fn status(&self, namespace: &str, name: &str) -> ExternalDNSStatus {
        self.objects
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .and_then(|o| o.status.clone())
            .unwrap_or_default()
    }

    /// Drop an object, as if it had been deleted from the cluster.
    pub(crate) fn remove(&self, namespace: &str, name: &str) {
        self.objects
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
    }

    /// Number of status writes that were not skipped as no-ops.
    pub(crate) fn patch_count(&self) -> usize {
        self.patches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExternalDnsApi for FakeExternalDnsApi {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<ExternalDNS>, ReconcileError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<SecretData>, CredentialError> {
        Ok(self
            .secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        mutation: StatusMutation<'_>,
    ) -> Result<(), ReconcileError> {
        let mut objects = self.objects.lock().unwrap();
        let Some(object) = objects.get_mut(&(namespace.to_string(), name.to_string())) else {
            return Err(ReconcileError::Kube(anyhow::anyhow!("{namespace}/{name} not found")));
        };
        if let Some(updated) = mutate_status(object.status.as_ref(), mutation) {
            object.status = Some(updated);
            self.patches.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Source returning a fixed endpoint list.
pub(crate) struct StaticSource(pub(crate) Vec<Endpoint>);

#[async_trait]
impl Source for StaticSource {
    async fn endpoints(&self, _spec: &ExternalDNSSpec) -> Result<Vec<Endpoint>, PlanError> {
        Ok(self.0.clone())
    }
}

/// Source that takes `delay` to answer and tracks overlapping calls.
pub(crate) struct SlowSource {
    endpoints: Vec<Endpoint>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl SlowSource {
    pub(crate) fn new(endpoints: Vec<Endpoint>, delay: Duration) -> Self {
        Self {
            endpoints,
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Highest number of calls seen running at the same time.
    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for SlowSource {
    async fn endpoints(&self, _spec: &ExternalDNSSpec) -> Result<Vec<Endpoint>, PlanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.endpoints.clone())
    }
}

/// Provider wrapper counting write calls.
pub(crate) struct CountingProvider {
    inner: InMemoryProvider,
    writes: AtomicUsize,
}

impl CountingProvider {
    pub(crate) fn with_zone(domain: &str) -> Self {
        Self {
            inner: InMemoryProvider::with_zone(domain, domain),
            writes: AtomicUsize::new(0),
        }
    }

    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for CountingProvider {
    async fn records(&self) -> Result<Vec<Endpoint>, ProviderError> {
        self.inner.records().await
    }

    async fn apply_changes(&self, changes: &Changes) -> Result<(), ProviderError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.apply_changes(changes).await
    }
}

/// Factory handing out a TXT registry over one shared provider.
pub(crate) struct FixedProviderFactory(pub(crate) Arc<CountingProvider>);

#[async_trait]
impl ProviderFactory for FixedProviderFactory {
    async fn registry(&self, spec: &ExternalDNSSpec) -> Result<Arc<dyn Registry>, ProviderError> {
        Ok(Arc::new(TxtRegistry::new(
            self.0.clone(),
            spec.txt_owner_id.as_deref(),
            spec.txt_prefix.as_deref(),
        )))
    }
}
