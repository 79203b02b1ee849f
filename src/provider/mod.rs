// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS provider backends.
//!
//! A [`Provider`] reads and writes the records of one zone. The controller
//! never talks to a provider directly; it goes through a
//! [`Registry`](crate::registry::Registry) built by a [`ProviderFactory`].
//!
//! Shipped backends:
//!
//! - [`inmemory`] - process-local zones, used for dry runs and tests
//! - [`webhook`] - any provider exposed through the external-dns webhook protocol
//!
//! The cloud providers (`aws`, `azure`, `google`, `cloudflare`,
//! `digitalocean`) are reached through a webhook sidecar: with `webhookUrl`
//! set they use the webhook backend, without it they are reported as
//! unsupported.

pub mod inmemory;
pub mod webhook;

use crate::crd::{ExternalDNSSpec, RegistryKind};
use crate::endpoint::Endpoint;
use crate::errors::ProviderError;
use crate::plan::Changes;
use crate::registry::{NoopRegistry, Registry, TxtRegistry};
use async_trait::async_trait;
use inmemory::InMemoryProvider;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use webhook::WebhookProvider;

/// Provider names understood by the controller.
pub const PROVIDER_AWS: &str = "aws";
pub const PROVIDER_AZURE: &str = "azure";
pub const PROVIDER_GOOGLE: &str = "google";
pub const PROVIDER_CLOUDFLARE: &str = "cloudflare";
pub const PROVIDER_DIGITALOCEAN: &str = "digitalocean";
pub const PROVIDER_INMEMORY: &str = "inmemory";
pub const PROVIDER_WEBHOOK: &str = "webhook";

/// Records and changes for one zone at a DNS provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// All records currently in the provider's zones.
    async fn records(&self) -> Result<Vec<Endpoint>, ProviderError>;

    /// Apply a change set. The call is treated as atomic by callers.
    async fn apply_changes(&self, changes: &Changes) -> Result<(), ProviderError>;

    /// Canonicalize desired endpoints into the form the provider stores.
    async fn adjust_endpoints(&self, endpoints: Vec<Endpoint>) -> Result<Vec<Endpoint>, ProviderError> {
        Ok(endpoints)
    }

    /// Whether two values of a provider-specific property are equivalent.
    fn property_values_equal(&self, _name: &str, current: &str, desired: &str) -> bool {
        current == desired
    }
}

/// Builds the registry (and the provider behind it) for a resource.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the spec names an unusable provider.
    async fn registry(&self, spec: &ExternalDNSSpec) -> Result<Arc<dyn Registry>, ProviderError>;
}

/// Factory for the backends shipped with the controller.
///
/// In-memory zones are kept for the lifetime of the factory so that
/// successive reconciles of the same zone observe each other's writes.
pub struct DefaultProviderFactory {
    http_client: reqwest::Client,
    inmemory: Mutex<HashMap<String, Arc<InMemoryProvider>>>,
}

impl DefaultProviderFactory {
    #[must_use]
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            inmemory: Mutex::new(HashMap::new()),
        }
    }

    async fn inmemory_provider(&self, spec: &ExternalDNSSpec) -> Arc<InMemoryProvider> {
        let zone_id = spec.zone.clone().unwrap_or_else(|| spec.domain.clone());
        let mut zones = self.inmemory.lock().await;
        zones
            .entry(zone_id.clone())
            .or_insert_with(|| {
                debug!(zone = %zone_id, domain = %spec.domain, "Creating in-memory zone");
                Arc::new(InMemoryProvider::with_zone(&zone_id, &spec.domain))
            })
            .clone()
    }

    fn webhook_provider(&self, spec: &ExternalDNSSpec) -> Result<Arc<dyn Provider>, ProviderError> {
        let url = spec
            .webhook_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                ProviderError::InvalidConfiguration(format!(
                    "provider '{}' requires spec.webhookUrl",
                    spec.provider
                ))
            })?;
        Ok(Arc::new(WebhookProvider::new(self.http_client.clone(), url)?))
    }
}

#[async_trait]
impl ProviderFactory for DefaultProviderFactory {
    async fn registry(&self, spec: &ExternalDNSSpec) -> Result<Arc<dyn Registry>, ProviderError> {
        let provider: Arc<dyn Provider> = match spec.provider.as_str() {
            PROVIDER_INMEMORY => self.inmemory_provider(spec).await,
            PROVIDER_WEBHOOK => self.webhook_provider(spec)?,
            PROVIDER_AWS | PROVIDER_AZURE | PROVIDER_GOOGLE | PROVIDER_CLOUDFLARE
            | PROVIDER_DIGITALOCEAN => {
                if spec.webhook_url.as_deref().is_some_and(|u| !u.is_empty()) {
                    self.webhook_provider(spec)?
                } else {
                    return Err(ProviderError::Unsupported(spec.provider.clone()));
                }
            }
            other => {
                return Err(ProviderError::InvalidConfiguration(format!(
                    "unknown provider '{other}'"
                )))
            }
        };

        Ok(match spec.registry {
            RegistryKind::Txt => Arc::new(TxtRegistry::new(
                provider,
                spec.txt_owner_id.as_deref(),
                spec.txt_prefix.as_deref(),
            )),
            RegistryKind::Noop => Arc::new(NoopRegistry::new(provider)),
        })
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
