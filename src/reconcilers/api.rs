// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! API server access used by the `ExternalDNS` reconciler.
//!
//! Status writes are read-modify-write: the live object is fetched, the
//! mutation is applied to its status, and the result is patched back with a
//! `resourceVersion` precondition. A conflicting write (HTTP 409) restarts the
//! cycle from a fresh read.

use super::retry::retry_api_call;
use super::status::mutate_status;
use crate::constants::STATUS_PATCH_MAX_CONFLICT_RETRIES;
use crate::credentials::SecretData;
use crate::crd::{ExternalDNS, ExternalDNSStatus};
use crate::errors::{CredentialError, ReconcileError};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use tracing::debug;

/// Pure status mutation applied to the latest status of an object.
pub type StatusMutation<'a> = &'a (dyn Fn(&mut ExternalDNSStatus) + Send + Sync);

#[async_trait]
pub trait ExternalDnsApi: Send + Sync {
    /// Fetch the live object, `None` if it no longer exists.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<ExternalDNS>, ReconcileError>;

    /// Fetch a secret's data, `None` if the secret does not exist.
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<SecretData>, CredentialError>;

    /// Apply `mutation` to the object's status.
    ///
    /// No write is made when the mutation leaves the status semantically unchanged.
    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        mutation: StatusMutation<'_>,
    ) -> Result<(), ReconcileError>;
}

/// [`ExternalDnsApi`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeExternalDnsApi {
    client: Client,
}

impl KubeExternalDnsApi {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<ExternalDNS> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ExternalDnsApi for KubeExternalDnsApi {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<ExternalDNS>, ReconcileError> {
        let api = self.api(namespace);
        retry_api_call(|| api.get_opt(name), "get ExternalDNS")
            .await
            .map_err(ReconcileError::Kube)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<SecretData>, CredentialError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = retry_api_call(|| api.get_opt(name), "get Secret")
            .await
            .map_err(|e| CredentialError::Api(e.to_string()))?;

        Ok(secret.map(|s| {
            s.data
                .unwrap_or_default()
                .into_iter()
                .map(|(key, value)| (key, value.0))
                .collect()
        }))
    }

    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        mutation: StatusMutation<'_>,
    ) -> Result<(), ReconcileError> {
        let api = self.api(namespace);

        for attempt in 0..=STATUS_PATCH_MAX_CONFLICT_RETRIES {
            let Some(live) = self.get(namespace, name).await? else {
                debug!(namespace, name, "ExternalDNS gone, skipping status patch");
                return Ok(());
            };

            let Some(status) = mutate_status(live.status.as_ref(), mutation) else {
                debug!(namespace, name, "ExternalDNS status unchanged, skipping update");
                return Ok(());
            };

            let patch = json!({
                "metadata": { "resourceVersion": live.resource_version() },
                "status": status,
            });

            match api
                .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
                .await
            {
                Ok(_) => {
                    debug!(
                        namespace,
                        name,
                        phase = ?status.phase,
                        conditions = status.conditions.len(),
                        records = status.dns_records.len(),
                        "Updated ExternalDNS status"
                    );
                    return Ok(());
                }
                Err(kube::Error::Api(api_err)) if api_err.code == 409 => {
                    debug!(namespace, name, attempt, "Status patch conflicted, retrying");
                }
                Err(e) => return Err(ReconcileError::Kube(e.into())),
            }
        }

        Err(ReconcileError::Kube(anyhow::anyhow!(
            "status patch for {namespace}/{name} conflicted {} times",
            STATUS_PATCH_MAX_CONFLICT_RETRIES + 1
        )))
    }
}
