// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `credentials.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::test_support::ENV_LOCK;
    use tempfile::TempDir;

    fn secret(pairs: &[(&str, &str)]) -> SecretData {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.as_bytes().to_vec()))
            .collect()
    }

    #[tokio::test]
    async fn test_aws_writes_file_and_sets_env() {
        let _guard = ENV_LOCK.lock().await;
        let dir = TempDir::new().unwrap();
        let provisioner = CredentialProvisioner::new(dir.path());

        provisioner
            .set(
                &secret(&[("credentials", "[default]\naws_access_key_id=AKIA\n")]),
                "dns-system",
                "example-com",
                "aws",
            )
            .await
            .unwrap();

        let expected = dir.path().join("dns-system/example-com/aws-credentials");
        assert_eq!(
            std::fs::read_to_string(&expected).unwrap(),
            "[default]\naws_access_key_id=AKIA\n"
        );
        assert_eq!(
            std::env::var(AWS_SHARED_CREDENTIALS_FILE).unwrap(),
            expected.to_string_lossy()
        );

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&expected).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_repeated_set_overwrites() {
        let _guard = ENV_LOCK.lock().await;
        let dir = TempDir::new().unwrap();
        let provisioner = CredentialProvisioner::new(dir.path());

        for content in ["{\"v\":1}", "{\"v\":2}"] {
            provisioner
                .set(&secret(&[("credentials", content)]), "ns", "zone", "azure")
                .await
                .unwrap();
        }

        let path = dir.path().join("ns/zone/azure.json");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "{\"v\":2}");
    }

    #[tokio::test]
    async fn test_missing_credentials_key_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let provisioner = CredentialProvisioner::new(dir.path());

        let err = provisioner
            .set(&secret(&[("other", "x")]), "ns", "zone", "google")
            .await
            .unwrap_err();

        assert!(matches!(err, CredentialError::MissingKey { ref key, .. } if key == "credentials"));
        assert!(!dir.path().join("ns").exists());
    }

    #[tokio::test]
    async fn test_cloudflare_token_leaves_key_pair_untouched() {
        let _guard = ENV_LOCK.lock().await;
        std::env::set_var(CF_API_KEY, "previous-key");
        std::env::set_var(CF_API_EMAIL, "previous@example.com");

        let provisioner = CredentialProvisioner::new("/nonexistent");
        provisioner
            .set(
                &secret(&[
                    ("CF_API_TOKEN", "token-123"),
                    ("CF_API_KEY", "new-key"),
                    ("CF_API_EMAIL", "new@example.com"),
                ]),
                "ns",
                "zone",
                "cloudflare",
            )
            .await
            .unwrap();

        assert_eq!(std::env::var(CF_API_TOKEN).unwrap(), "token-123");
        assert_eq!(std::env::var(CF_API_KEY).unwrap(), "previous-key");
        assert_eq!(std::env::var(CF_API_EMAIL).unwrap(), "previous@example.com");
    }

    #[tokio::test]
    async fn test_cloudflare_key_pair() {
        let _guard = ENV_LOCK.lock().await;
        let provisioner = CredentialProvisioner::new("/nonexistent");
        provisioner
            .set(
                &secret(&[("CF_API_KEY", "k"), ("CF_API_EMAIL", "ops@example.com")]),
                "ns",
                "zone",
                "cloudflare",
            )
            .await
            .unwrap();

        assert_eq!(std::env::var(CF_API_KEY).unwrap(), "k");
        assert_eq!(std::env::var(CF_API_EMAIL).unwrap(), "ops@example.com");
    }

    #[tokio::test]
    async fn test_cloudflare_key_without_email_names_missing_key() {
        let provisioner = CredentialProvisioner::new("/nonexistent");
        let err = provisioner
            .set(&secret(&[("CF_API_KEY", "k")]), "ns", "zone", "cloudflare")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("CF_API_EMAIL"));
    }

    #[tokio::test]
    async fn test_digitalocean_requires_token() {
        let provisioner = CredentialProvisioner::new("/nonexistent");
        let err = provisioner
            .set(&secret(&[]), "ns", "zone", "digitalocean")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("DO_TOKEN"));
    }

    #[tokio::test]
    async fn test_unknown_provider_is_unsupported() {
        let provisioner = CredentialProvisioner::new("/nonexistent");
        let err = provisioner
            .set(&secret(&[]), "ns", "zone", "bind")
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::UnsupportedProvider(_)));
    }

    #[tokio::test]
    async fn test_providers_without_credentials_are_noop() {
        let provisioner = CredentialProvisioner::new("/nonexistent");
        for provider in ["inmemory", "webhook"] {
            provisioner
                .set(&secret(&[]), "ns", "zone", provider)
                .await
                .unwrap();
            assert!(!requires_secret(provider));
        }
        assert!(requires_secret("aws"));
    }

    #[test]
    fn test_resource_dir_rejects_path_escape() {
        let provisioner = CredentialProvisioner::new("/base");
        assert!(provisioner.resource_dir("..", "zone").is_err());
        assert!(provisioner.resource_dir("ns", "a/b").is_err());
        assert!(provisioner.resource_dir("NS", "zone").is_err());
        assert_eq!(
            provisioner.resource_dir("ns", "zone").unwrap(),
            PathBuf::from("/base/ns/zone")
        );
    }

    #[test]
    fn test_resource_dir_accepts_dotted_names() {
        let provisioner = CredentialProvisioner::new("/base");
        assert_eq!(
            provisioner.resource_dir("ns", "example.com").unwrap(),
            PathBuf::from("/base/ns/example.com")
        );
        assert!(provisioner.resource_dir("ns", ".").is_err());
        assert!(provisioner.resource_dir("ns", "..").is_err());
        assert!(provisioner.resource_dir("ns", "example..com").is_err());
        assert!(provisioner.resource_dir("ns", ".example.com").is_err());
        assert!(provisioner.resource_dir("dns.system", "zone").is_err());
        assert!(provisioner.resource_dir("ns", &"a.".repeat(127)).is_err());
    }

    #[tokio::test]
    async fn test_aws_credentials_for_dotted_resource_name() {
        let _guard = ENV_LOCK.lock().await;
        let dir = TempDir::new().unwrap();
        let provisioner = CredentialProvisioner::new(dir.path());

        provisioner
            .set(
                &secret(&[("credentials", "[default]\n")]),
                "dns-system",
                "example.com",
                "aws",
            )
            .await
            .unwrap();

        let expected = dir.path().join("dns-system/example.com/aws-credentials");
        assert_eq!(std::fs::read_to_string(&expected).unwrap(), "[default]\n");
    }
}
