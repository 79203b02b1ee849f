// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Dynamic source watches.
//!
//! `ExternalDNS` objects name the kind of cluster object they read records
//! from (Node, Service, Ingress). The controller only learns those kinds at
//! runtime, so watches on them are installed lazily, the first time a
//! reconcile asks for one.
//!
//! [`WatchRegistry`] guarantees that each group-kind is installed on the
//! underlying [`WatchSource`] at most once for the lifetime of the process.
//! Membership is claimed before installation and released again if the
//! installation fails, so a later reconcile can retry.
//!
//! [`KubeWatchSource`] is the production source: it spawns a
//! [`kube::runtime::watcher`] over `DynamicObject`s of the kind and maps
//! every event back to the `ExternalDNS` objects that reference that kind.

use crate::constants::CORE_GROUP_NAME;
use crate::crd::{ExternalDNS, SourceKind};
use crate::errors::WatchError;
use crate::metrics;
use async_trait::async_trait;
use futures::channel::mpsc::UnboundedSender;
use futures::StreamExt;
use kube::api::{Api, DynamicObject, ListParams};
use kube::discovery::{self, Scope};
use kube::runtime::reflector::{ObjectRef, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::Client;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::{debug, error, info, warn};

/// API group plus kind of a watched object type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupKind {
    /// API group, empty for the core group.
    pub group: String,
    pub kind: String,
}

impl GroupKind {
    #[must_use]
    pub fn new(group: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            kind: kind.to_string(),
        }
    }

    /// Canonical membership key, e.g. `Node.core` or `Ingress.networking.k8s.io`.
    #[must_use]
    pub fn key(&self) -> String {
        let group = if self.group.is_empty() {
            CORE_GROUP_NAME
        } else {
            self.group.as_str()
        };
        format!("{}.{group}", self.kind)
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<SourceKind> for GroupKind {
    fn from(kind: SourceKind) -> Self {
        GroupKind::new(kind.group(), kind.kind())
    }
}

/// Event source able to start watching a kind.
#[async_trait]
pub trait WatchSource: Send + Sync {
    /// Start watching `kind`. Called at most once per kind by [`WatchRegistry`].
    async fn install(&self, kind: &GroupKind) -> Result<(), WatchError>;
}

/// At-most-once registry of installed watches.
#[derive(Default)]
pub struct WatchRegistry {
    installed: Mutex<HashSet<String>>,
    source: OnceLock<Arc<dyn WatchSource>>,
}

impl WatchRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry already bound to a watch source.
    #[must_use]
    pub fn with_source(source: Arc<dyn WatchSource>) -> Self {
        let registry = Self::new();
        registry.bind(source);
        registry
    }

    /// Bind the event source. Only the first call has an effect.
    pub fn bind(&self, source: Arc<dyn WatchSource>) -> bool {
        self.source.set(source).is_ok()
    }

    /// Ensure `kind` is watched.
    ///
    /// Returns immediately if the kind is already installed, or if no source
    /// is bound yet.
    ///
    /// # Errors
    ///
    /// Returns the installation error; the kind is then eligible for another attempt.
    pub async fn watch(&self, kind: &GroupKind) -> Result<(), WatchError> {
        let Some(source) = self.source.get() else {
            debug!(kind = %kind, "No watch source bound yet, skipping watch");
            return Ok(());
        };

        let key = kind.key();
        if !self.lock().insert(key.clone()) {
            return Ok(());
        }
        let mut claim = Claim {
            registry: self,
            key: &key,
            kept: false,
        };

        match source.install(kind).await {
            Ok(()) => {
                claim.keep();
                let count = self.lock().len();
                metrics::set_registered_watches(count);
                info!(kind = %key, watches = count, "Installed source watch");
                Ok(())
            }
            Err(e) => {
                warn!(kind = %key, error = %e, "Failed to install source watch");
                Err(e)
            }
        }
    }

    #[must_use]
    pub fn is_watching(&self, kind: &GroupKind) -> bool {
        self.lock().contains(&kind.key())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.installed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Membership claimed by an in-flight install.
///
/// Dropped without [`Claim::keep`] (install failed, or the caller's future was
/// cancelled) it releases the key so the kind can be installed again.
struct Claim<'a> {
    registry: &'a WatchRegistry,
    key: &'a str,
    kept: bool,
}

impl Claim<'_> {
    fn keep(&mut self) {
        self.kept = true;
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.kept {
            self.registry.lock().remove(self.key);
        }
    }
}

/// `ExternalDNS` objects whose source is `kind`.
#[must_use]
pub fn referencing_resources(resources: &[Arc<ExternalDNS>], kind: &GroupKind) -> Vec<ObjectRef<ExternalDNS>> {
    resources
        .iter()
        .filter(|edns| GroupKind::from(edns.spec.source.kind) == *kind)
        .map(|edns| ObjectRef::from_obj(edns.as_ref()))
        .collect()
}

/// `ExternalDNS` objects in `namespace` whose provider secret is `secret_name`.
#[must_use]
pub fn secret_referrers(
    resources: &[Arc<ExternalDNS>],
    namespace: Option<&str>,
    secret_name: &str,
) -> Vec<ObjectRef<ExternalDNS>> {
    resources
        .iter()
        .filter(|edns| edns.metadata.namespace.as_deref() == namespace)
        .filter(|edns| {
            edns.spec
                .provider_secret_ref
                .as_ref()
                .is_some_and(|r| r.name == secret_name)
        })
        .map(|edns| ObjectRef::from_obj(edns.as_ref()))
        .collect()
}

/// Watch source backed by the Kubernetes API.
pub struct KubeWatchSource {
    client: Client,
    namespace: Option<String>,
    resources: Store<ExternalDNS>,
    trigger: UnboundedSender<ObjectRef<ExternalDNS>>,
}

impl KubeWatchSource {
    /// `resources` is the controller's reflector store; references to
    /// affected objects are pushed on `trigger`.
    #[must_use]
    pub fn new(
        client: Client,
        namespace: Option<String>,
        resources: Store<ExternalDNS>,
        trigger: UnboundedSender<ObjectRef<ExternalDNS>>,
    ) -> Self {
        Self {
            client,
            namespace,
            resources,
            trigger,
        }
    }
}

#[async_trait]
impl WatchSource for KubeWatchSource {
    async fn install(&self, kind: &GroupKind) -> Result<(), WatchError> {
        let install_failed = |reason: String| WatchError::InstallFailed {
            kind: kind.key(),
            reason,
        };

        let group = discovery::group(&self.client, &kind.group)
            .await
            .map_err(|e| install_failed(format!("discovery failed: {e}")))?;
        let (resource, caps) = group
            .recommended_kind(&kind.kind)
            .ok_or_else(|| WatchError::KindNotFound { kind: kind.key() })?;

        let api: Api<DynamicObject> = match (&caps.scope, &self.namespace) {
            (Scope::Namespaced, Some(ns)) => Api::namespaced_with(self.client.clone(), ns, &resource),
            _ => Api::all_with(self.client.clone(), &resource),
        };

        // Fail here, not in the background task, when RBAC denies access.
        api.list(&ListParams::default().limit(1))
            .await
            .map_err(|e| install_failed(format!("list access check failed: {e}")))?;

        let kind = kind.clone();
        let resources = self.resources.clone();
        let trigger = self.trigger.clone();
        tokio::spawn(async move {
            let mut events = watcher(api, watcher::Config::default())
                .default_backoff()
                .boxed();
            while let Some(event) = events.next().await {
                match event {
                    Ok(watcher::Event::Apply(_) | watcher::Event::Delete(_) | watcher::Event::InitDone) => {
                        for object in referencing_resources(&resources.state(), &kind) {
                            if trigger.unbounded_send(object).is_err() {
                                debug!(kind = %kind, "Controller stopped, ending source watch");
                                return;
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => error!(kind = %kind, error = %e, "Source watch error"),
                }
            }
        });

        Ok(())
    }
}

#[cfg(test)]
#[path = "watch_registry_tests.rs"]
mod watch_registry_tests;
