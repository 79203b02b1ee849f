// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Provider credential materialization.
//!
//! Provider SDKs pick their credentials up from process-global locations:
//! a credentials file named by an environment variable, or the variables
//! themselves. [`CredentialProvisioner::set`] turns a secret payload into
//! those locations for one provider.
//!
//! | Provider       | Secret keys                                  | Result                                             |
//! |----------------|----------------------------------------------|----------------------------------------------------|
//! | `aws`          | `credentials`                                | `aws-credentials` file, `AWS_SHARED_CREDENTIALS_FILE` |
//! | `azure`        | `credentials`                                | `azure.json` file, `AZURE_AUTH_LOCATION`           |
//! | `google`       | `credentials`                                | `google-credentials.json` file, `GOOGLE_APPLICATION_CREDENTIALS` |
//! | `cloudflare`   | `CF_API_TOKEN`, or `CF_API_KEY`+`CF_API_EMAIL` | environment variables                            |
//! | `digitalocean` | `DO_TOKEN`                                   | environment variable                               |
//! | `inmemory`, `webhook` | none                                  | nothing                                            |
//!
//! Files live under `<base>/<namespace>/<name>/` and are overwritten on
//! every call. The variables are process-global, so callers must serialize
//! calls across resources.

use crate::constants::{
    AWS_SHARED_CREDENTIALS_FILE, AZURE_AUTH_LOCATION, CF_API_EMAIL, CF_API_KEY, CF_API_TOKEN,
    DO_TOKEN, GOOGLE_APPLICATION_CREDENTIALS, SECRET_KEY_CREDENTIALS,
};
use crate::errors::CredentialError;
use crate::provider::{
    PROVIDER_AWS, PROVIDER_AZURE, PROVIDER_CLOUDFLARE, PROVIDER_DIGITALOCEAN, PROVIDER_GOOGLE,
    PROVIDER_INMEMORY, PROVIDER_WEBHOOK,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Decoded secret data, key to raw bytes.
pub type SecretData = BTreeMap<String, Vec<u8>>;

/// Whether the provider needs a secret at all.
#[must_use]
pub fn requires_secret(provider: &str) -> bool {
    !matches!(provider, PROVIDER_INMEMORY | PROVIDER_WEBHOOK)
}

/// Materializes provider credentials below a base directory.
#[derive(Clone, Debug)]
pub struct CredentialProvisioner {
    base_dir: PathBuf,
}

impl CredentialProvisioner {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Directory holding the credential files of one resource.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::InvalidResourceKey`] unless `namespace` is a
    /// DNS-1123 label and `name` a DNS-1123 subdomain.
    pub fn resource_dir(&self, namespace: &str, name: &str) -> Result<PathBuf, CredentialError> {
        if !is_dns1123_label(namespace) {
            return Err(CredentialError::InvalidResourceKey(namespace.to_string()));
        }
        if !is_dns1123_subdomain(name) {
            return Err(CredentialError::InvalidResourceKey(name.to_string()));
        }
        Ok(self.base_dir.join(namespace).join(name))
    }

    /// Materialize `secret` for `provider` on behalf of `namespace/name`.
    ///
    /// The secret shape is validated before anything is written.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] for an unknown provider, a missing or
    /// non-UTF-8 key, an invalid resource key, or a failed write.
    pub async fn set(
        &self,
        secret: &SecretData,
        namespace: &str,
        name: &str,
        provider: &str,
    ) -> Result<(), CredentialError> {
        match provider {
            PROVIDER_AWS => {
                self.write_file(secret, namespace, name, provider, "aws-credentials", AWS_SHARED_CREDENTIALS_FILE)
                    .await
            }
            PROVIDER_AZURE => {
                self.write_file(secret, namespace, name, provider, "azure.json", AZURE_AUTH_LOCATION)
                    .await
            }
            PROVIDER_GOOGLE => {
                self.write_file(
                    secret,
                    namespace,
                    name,
                    provider,
                    "google-credentials.json",
                    GOOGLE_APPLICATION_CREDENTIALS,
                )
                .await
            }
            PROVIDER_CLOUDFLARE => set_cloudflare(secret),
            PROVIDER_DIGITALOCEAN => {
                let token = required_text(secret, provider, DO_TOKEN)?;
                set_env(DO_TOKEN, &token);
                Ok(())
            }
            PROVIDER_INMEMORY | PROVIDER_WEBHOOK => {
                debug!(provider = %provider, "Provider needs no credentials");
                Ok(())
            }
            other => Err(CredentialError::UnsupportedProvider(other.to_string())),
        }
    }

    async fn write_file(
        &self,
        secret: &SecretData,
        namespace: &str,
        name: &str,
        provider: &str,
        file_name: &str,
        env_var: &str,
    ) -> Result<(), CredentialError> {
        let blob = secret
            .get(SECRET_KEY_CREDENTIALS)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CredentialError::MissingKey {
                provider: provider.to_string(),
                key: SECRET_KEY_CREDENTIALS.to_string(),
            })?;

        let dir = self.resource_dir(namespace, name)?;
        let path = dir.join(file_name);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| io_error(&dir, source))?;
        write_private(&path, blob).await?;

        set_env(env_var, &path.to_string_lossy());
        info!(
            provider = %provider,
            path = %path.display(),
            env = %env_var,
            "Materialized provider credentials file"
        );
        Ok(())
    }
}

fn set_cloudflare(secret: &SecretData) -> Result<(), CredentialError> {
    if let Some(token) = optional_text(secret, PROVIDER_CLOUDFLARE, CF_API_TOKEN)? {
        set_env(CF_API_TOKEN, &token);
        return Ok(());
    }

    let key = optional_text(secret, PROVIDER_CLOUDFLARE, CF_API_KEY)?;
    let email = optional_text(secret, PROVIDER_CLOUDFLARE, CF_API_EMAIL)?;
    match (key, email) {
        (Some(key), Some(email)) => {
            set_env(CF_API_KEY, &key);
            set_env(CF_API_EMAIL, &email);
            Ok(())
        }
        (Some(_), None) => Err(CredentialError::MissingKey {
            provider: PROVIDER_CLOUDFLARE.to_string(),
            key: CF_API_EMAIL.to_string(),
        }),
        _ => Err(CredentialError::MissingKey {
            provider: PROVIDER_CLOUDFLARE.to_string(),
            key: format!("{CF_API_TOKEN} or {CF_API_KEY}+{CF_API_EMAIL}"),
        }),
    }
}

fn optional_text(secret: &SecretData, provider: &str, key: &str) -> Result<Option<String>, CredentialError> {
    match secret.get(key).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(bytes) => String::from_utf8(bytes.clone())
            .map(|s| Some(s.trim().to_string()))
            .map_err(|_| CredentialError::InvalidValue {
                provider: provider.to_string(),
                key: key.to_string(),
            }),
    }
}

fn required_text(secret: &SecretData, provider: &str, key: &str) -> Result<String, CredentialError> {
    optional_text(secret, provider, key)?.ok_or_else(|| CredentialError::MissingKey {
        provider: provider.to_string(),
        key: key.to_string(),
    })
}

fn set_env(key: &str, value: &str) {
    std::env::set_var(key, value);
    debug!(env = %key, "Set provider environment variable");
}

fn io_error(path: &Path, source: std::io::Error) -> CredentialError {
    CredentialError::Io {
        path: path.display().to_string(),
        source,
    }
}

async fn write_private(path: &Path, contents: &[u8]) -> Result<(), CredentialError> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(path)
        .await
        .map_err(|source| io_error(path, source))?;
    file.write_all(contents)
        .await
        .map_err(|source| io_error(path, source))?;
    file.flush().await.map_err(|source| io_error(path, source))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(|source| io_error(path, source))?;
    }
    Ok(())
}

fn is_dns1123_label(value: &str) -> bool {
    let bytes = value.as_bytes();
    !bytes.is_empty()
        && bytes.len() <= 63
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        && bytes[0] != b'-'
        && bytes[bytes.len() - 1] != b'-'
}

/// Object names: dot-separated labels, 253 characters at most. Every label is
/// non-empty and starts alphanumeric, so `.` and `..` never pass.
fn is_dns1123_subdomain(value: &str) -> bool {
    value.len() <= 253 && value.split('.').all(is_dns1123_label)
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod credentials_tests;
