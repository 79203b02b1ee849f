// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the extdns controller.
//!
//! Each reconcile stage has its own error type so that status conditions and
//! metrics can report precisely which stage failed:
//!
//! - [`WatchError`] - installing a dynamic watch on a source kind
//! - [`CredentialError`] - validating and materializing provider credentials
//! - [`ProviderError`] - reading or writing records at the DNS provider
//! - [`PlanError`] - computing or applying a plan
//! - [`ReconcileError`] - the envelope returned to the controller runtime
//!
//! None of these are fatal to the process; every one of them leaves the
//! resource reconcilable on the next trigger.

use thiserror::Error;

/// Errors raised while installing a watch on a source kind.
#[derive(Error, Debug, Clone)]
pub enum WatchError {
    /// The API server does not serve the requested kind.
    #[error("kind {kind} is not served by the API server")]
    KindNotFound {
        /// Canonical group-kind key (e.g. `Ingress.networking.k8s.io`)
        kind: String,
    },

    /// The underlying event source rejected the watch.
    #[error("failed to install watch for {kind}: {reason}")]
    InstallFailed {
        /// Canonical group-kind key
        kind: String,
        /// Underlying failure
        reason: String,
    },
}

impl WatchError {
    /// Metric label for this error category.
    #[must_use]
    pub fn metric_label(&self) -> &'static str {
        match self {
            WatchError::KindNotFound { .. } => "watch_kind_not_found",
            WatchError::InstallFailed { .. } => "watch_install_failed",
        }
    }
}

/// Errors raised while validating or materializing provider credentials.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// The referenced Secret does not exist.
    #[error("secret {namespace}/{name} not found")]
    SecretNotFound {
        /// Namespace of the secret
        namespace: String,
        /// Name of the secret
        name: String,
    },

    /// The provider needs a secret but the resource does not reference one.
    #[error("provider {provider} requires spec.providerSecretRef")]
    SecretRefMissing {
        /// Provider name
        provider: String,
    },

    /// A key required by the provider is absent from the secret.
    #[error("secret for provider {provider} is missing required key '{key}'")]
    MissingKey {
        /// Provider name
        provider: String,
        /// The missing key (or key alternatives)
        key: String,
    },

    /// A secret value is not valid UTF-8 where text is required.
    #[error("secret key '{key}' for provider {provider} is not valid UTF-8")]
    InvalidValue {
        /// Provider name
        provider: String,
        /// The offending key
        key: String,
    },

    /// No materializer exists for the provider.
    #[error("unsupported provider '{0}'")]
    UnsupportedProvider(String),

    /// The resource key cannot be turned into a safe path component.
    #[error("invalid resource key component '{0}'")]
    InvalidResourceKey(String),

    /// Writing the credentials file failed.
    #[error("failed to write credentials to {path}: {source}")]
    Io {
        /// Target path
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Reading the secret from the API server failed.
    #[error("failed to read secret: {0}")]
    Api(String),
}

/// Errors reported by a DNS provider backend.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// The provider has no backend available in this build.
    #[error("provider '{0}' is not supported without a webhook endpoint")]
    Unsupported(String),

    /// The resource spec is not usable for this provider.
    #[error("invalid provider configuration: {0}")]
    InvalidConfiguration(String),

    /// Listing current records failed.
    #[error("failed to list records: {0}")]
    Records(String),

    /// Applying a change set failed.
    #[error("failed to apply changes: {0}")]
    ApplyChanges(String),

    /// A change conflicts with the provider's current state.
    #[error("conflicting change for {record}: {reason}")]
    Conflict {
        /// Record identity (`TYPE name`)
        record: String,
        /// Why it conflicts
        reason: String,
    },

    /// Transport-level failure talking to the provider.
    #[error("provider request to {endpoint} failed: {reason}")]
    Transport {
        /// Provider endpoint
        endpoint: String,
        /// Failure description
        reason: String,
    },
}

/// Stage of the plan pipeline that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStage {
    /// Fetching desired endpoints from the source
    Source,
    /// Reading current records from the provider
    Records,
    /// Applying the missing-records plan
    MissingRecords,
    /// Applying the general sync plan
    Sync,
}

impl std::fmt::Display for PlanStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanStage::Source => write!(f, "source"),
            PlanStage::Records => write!(f, "records"),
            PlanStage::MissingRecords => write!(f, "missing-records"),
            PlanStage::Sync => write!(f, "sync"),
        }
    }
}

/// Errors raised while computing or applying a plan.
#[derive(Error, Debug)]
pub enum PlanError {
    /// The domain filter is not a valid regular expression.
    #[error("invalid domain filter: {0}")]
    InvalidDomainFilter(String),

    /// The managed record type list contains an unknown type.
    #[error("invalid managed record type: {0}")]
    InvalidRecordType(String),

    /// The provider failed during the named stage.
    #[error("{stage} stage failed: {source}")]
    Provider {
        /// Stage that failed
        stage: PlanStage,
        /// Provider error, uninterpreted
        #[source]
        source: ProviderError,
    },

    /// The source collaborator could not produce desired endpoints.
    #[error("source failed: {0}")]
    Source(String),
}

/// Errors returned from a reconcile invocation.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A step did not finish before the reconcile deadline.
    #[error("{step} timed out after {seconds}s")]
    Timeout {
        /// Step that timed out
        step: &'static str,
        /// Deadline budget in seconds
        seconds: u64,
    },

    /// Kubernetes API failure outside of the status patch.
    #[error("kubernetes API error: {0}")]
    Kube(#[source] anyhow::Error),
}

impl ReconcileError {
    /// Metric label for this error category.
    #[must_use]
    pub fn metric_label(&self) -> &'static str {
        match self {
            ReconcileError::Watch(e) => e.metric_label(),
            ReconcileError::Credential(_) => "credential_error",
            ReconcileError::Plan(_) | ReconcileError::Provider(_) => "plan_error",
            ReconcileError::Timeout { .. } => "timeout",
            ReconcileError::Kube(_) => "api_error",
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
