// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the extdns operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the `ExternalDNS` CRD
pub const API_GROUP: &str = "extdns.firestoned.io";

/// API version for the `ExternalDNS` CRD
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "extdns.firestoned.io/v1alpha1";

/// Kind name for `ExternalDNS` resource
pub const KIND_EXTERNAL_DNS: &str = "ExternalDNS";

/// Group name rendered in watch keys for the core (legacy) API group
pub const CORE_GROUP_NAME: &str = "core";

// ============================================================================
// Condition Types
// ============================================================================

/// Condition type recording whether the source kind watch is installed
pub const CONDITION_WATCHER_REGISTERED: &str = "WatcherRegistered";

/// Condition type recording whether provider credentials were materialized
pub const CONDITION_CREDENTIAL_CONFIGURED: &str = "CredentialConfigured";

/// Condition type recording whether the last plan was applied
pub const CONDITION_PLAN_APPLIED: &str = "PlanApplied";

/// Condition status value for a satisfied condition
pub const CONDITION_STATUS_TRUE: &str = "True";

/// Condition status value for an unsatisfied condition
pub const CONDITION_STATUS_FALSE: &str = "False";

// ============================================================================
// DNS Defaults
// ============================================================================

/// Record types managed when `managedDnsRecordTypes` is empty
pub const DEFAULT_MANAGED_RECORD_TYPES: &[&str] = &["A", "AAAA", "CNAME"];

/// Owner id used when `txtOwnerId` is not set
pub const DEFAULT_TXT_OWNER_ID: &str = "default";

/// Heritage value written into TXT ownership markers
pub const TXT_HERITAGE: &str = "external-dns";

// ============================================================================
// Source Annotations
// ============================================================================

/// Annotation listing hostnames for a Service or Ingress (comma separated)
pub const ANNOTATION_HOSTNAME: &str = "external-dns.alpha.kubernetes.io/hostname";

/// Annotation overriding the record TTL in seconds
pub const ANNOTATION_TTL: &str = "external-dns.alpha.kubernetes.io/ttl";

// ============================================================================
// Credential Materialization
// ============================================================================

/// Default base directory for materialized provider credentials
pub const DEFAULT_CREDENTIALS_DIR: &str = "/var/run/extdns/credentials";

/// Secret key holding a credentials file blob (aws, azure, google)
pub const SECRET_KEY_CREDENTIALS: &str = "credentials";

/// Cloudflare API token secret key and environment variable
pub const CF_API_TOKEN: &str = "CF_API_TOKEN";

/// Cloudflare global API key secret key and environment variable
pub const CF_API_KEY: &str = "CF_API_KEY";

/// Cloudflare account email secret key and environment variable
pub const CF_API_EMAIL: &str = "CF_API_EMAIL";

/// DigitalOcean token secret key and environment variable
pub const DO_TOKEN: &str = "DO_TOKEN";

/// Environment variable pointing the AWS SDK at a shared credentials file
pub const AWS_SHARED_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";

/// Environment variable pointing the Azure SDK at its auth file
pub const AZURE_AUTH_LOCATION: &str = "AZURE_AUTH_LOCATION";

/// Environment variable pointing Google SDKs at a service account key
pub const GOOGLE_APPLICATION_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";

// ============================================================================
// Controller Timing Constants
// ============================================================================

/// Requeue interval after a successful reconciliation (1 minute)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 60;

/// Upper bound on a single reconciliation (5 minutes)
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 300;

/// First error requeue delay (5 seconds)
pub const ERROR_BACKOFF_BASE_SECS: u64 = 5;

/// Largest error requeue delay (5 minutes)
pub const ERROR_BACKOFF_MAX_SECS: u64 = 300;

/// Conflict retries for optimistic status patches
pub const STATUS_PATCH_MAX_CONFLICT_RETRIES: u32 = 5;

// ============================================================================
// Webhook Provider Constants
// ============================================================================

/// Media type negotiated with external-dns webhook providers
pub const WEBHOOK_MEDIA_TYPE: &str = "application/external.dns.webhook+json;version=1";

/// HTTP timeout for webhook provider calls
pub const WEBHOOK_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
