// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! External-dns webhook provider client.
//!
//! Speaks the webhook protocol used by external-dns provider sidecars:
//!
//! - `GET /records` returns the zone's endpoints
//! - `POST /records` applies `{Create, UpdateOld, UpdateNew, Delete}`
//! - `POST /adjustendpoints` canonicalizes desired endpoints
//!
//! Every request negotiates `application/external.dns.webhook+json;version=1`.
//! Reads are retried on 429 and 5xx; writes are not.

use super::Provider;
use crate::constants::{WEBHOOK_MEDIA_TYPE, WEBHOOK_TIMEOUT_SECS};
use crate::endpoint::Endpoint;
use crate::errors::ProviderError;
use crate::plan::Changes;
use crate::reconcilers::retry::{is_retryable_http_status, RetryPolicy};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Client for one webhook provider endpoint.
pub struct WebhookProvider {
    client: HttpClient,
    base_url: Url,
}

/// Failure of one HTTP exchange, keeping the status for retry decisions.
struct RequestFailure {
    status: Option<StatusCode>,
    message: String,
}

impl WebhookProvider {
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidConfiguration`] if `url` is not an http(s) URL.
    pub fn new(client: HttpClient, url: &str) -> Result<Self, ProviderError> {
        let base_url = Url::parse(url)
            .map_err(|e| ProviderError::InvalidConfiguration(format!("webhookUrl '{url}': {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ProviderError::InvalidConfiguration(format!(
                "webhookUrl '{url}' must use http or https"
            )));
        }
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, RequestFailure> {
        let response = request
            .header(ACCEPT, WEBHOOK_MEDIA_TYPE)
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| RequestFailure {
                status: e.status(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RequestFailure {
                status: Some(status),
                message: format!("HTTP {status}: {body}"),
            });
        }
        Ok(response)
    }

    async fn fetch_records(&self, url: &str) -> Result<Vec<Endpoint>, RequestFailure> {
        let response = self.send(self.client.get(url)).await?;
        response.json::<Vec<Endpoint>>().await.map_err(|e| RequestFailure {
            status: None,
            message: format!("invalid records response: {e}"),
        })
    }

    fn json_body<T: serde::Serialize>(&self, body: &T) -> Result<Vec<u8>, ProviderError> {
        serde_json::to_vec(body)
            .map_err(|e| ProviderError::InvalidConfiguration(format!("cannot encode request: {e}")))
    }
}

#[async_trait]
impl Provider for WebhookProvider {
    async fn records(&self) -> Result<Vec<Endpoint>, ProviderError> {
        let url = self.url("records");
        let mut backoff = RetryPolicy::WEBHOOK.start();

        loop {
            match self.fetch_records(&url).await {
                Ok(records) => {
                    debug!(url = %url, count = records.len(), "Fetched webhook records");
                    return Ok(records);
                }
                Err(failure) => {
                    let retryable = failure.status.is_some_and(is_retryable_http_status);
                    match backoff.next() {
                        Some(delay) if retryable => {
                            warn!(
                                url = %url,
                                retry_after = ?delay,
                                error = %failure.message,
                                "Retryable webhook error, will retry"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        _ => return Err(ProviderError::Records(failure.message)),
                    }
                }
            }
        }
    }

    async fn apply_changes(&self, changes: &Changes) -> Result<(), ProviderError> {
        let url = self.url("records");
        let body = self.json_body(changes)?;
        self.send(
            self.client
                .post(&url)
                .header(CONTENT_TYPE, WEBHOOK_MEDIA_TYPE)
                .body(body),
        )
        .await
        .map_err(|failure| ProviderError::ApplyChanges(failure.message))?;

        debug!(
            url = %url,
            create = changes.create.len(),
            update = changes.update_new.len(),
            delete = changes.delete.len(),
            "Applied changes through webhook"
        );
        Ok(())
    }

    async fn adjust_endpoints(&self, endpoints: Vec<Endpoint>) -> Result<Vec<Endpoint>, ProviderError> {
        let url = self.url("adjustendpoints");
        let body = self.json_body(&endpoints)?;
        let response = self
            .send(
                self.client
                    .post(&url)
                    .header(CONTENT_TYPE, WEBHOOK_MEDIA_TYPE)
                    .body(body),
            )
            .await
            .map_err(|failure| ProviderError::Transport {
                endpoint: url.clone(),
                reason: failure.message,
            })?;

        response
            .json::<Vec<Endpoint>>()
            .await
            .map_err(|e| ProviderError::Transport {
                endpoint: url,
                reason: format!("invalid adjustendpoints response: {e}"),
            })
    }
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod webhook_tests;
