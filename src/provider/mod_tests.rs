// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the provider factory

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::endpoint::RecordType;
    use crate::test_support::spec;

    fn factory() -> DefaultProviderFactory {
        DefaultProviderFactory::new(reqwest::Client::new())
    }

    fn expect_err(result: Result<Arc<dyn Registry>, ProviderError>) -> ProviderError {
        match result {
            Ok(_) => panic!("expected the factory to fail"),
            Err(e) => e,
        }
    }

    #[tokio::test]
    async fn test_inmemory_zone_persists_across_registries() {
        let factory = factory();
        let s = spec("example.com", PROVIDER_INMEMORY);

        let first = factory.registry(&s).await.unwrap();
        first
            .apply_changes(&Changes::creates(vec![Endpoint::new(
                "app.example.com",
                RecordType::A,
                vec!["1.2.3.4".to_string()],
            )]))
            .await
            .unwrap();

        let second = factory.registry(&s).await.unwrap();
        let records = second.records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].dns_name, "app.example.com");
    }

    #[tokio::test]
    async fn test_txt_registry_uses_owner_id() {
        let mut s = spec("example.com", PROVIDER_INMEMORY);
        s.txt_owner_id = Some("cluster-a".to_string());
        let registry = factory().registry(&s).await.unwrap();
        assert_eq!(registry.owner_id(), Some("cluster-a"));
    }

    #[tokio::test]
    async fn test_noop_registry_has_no_owner() {
        let mut s = spec("example.com", PROVIDER_INMEMORY);
        s.registry = RegistryKind::Noop;
        let registry = factory().registry(&s).await.unwrap();
        assert_eq!(registry.owner_id(), None);
    }

    #[tokio::test]
    async fn test_webhook_requires_url() {
        let err = expect_err(factory().registry(&spec("example.com", PROVIDER_WEBHOOK)).await);
        assert!(matches!(err, ProviderError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("webhookUrl"));
    }

    #[tokio::test]
    async fn test_webhook_with_url_builds_registry() {
        let mut s = spec("example.com", PROVIDER_WEBHOOK);
        s.webhook_url = Some("http://localhost:8888".to_string());
        assert!(factory().registry(&s).await.is_ok());
    }

    #[tokio::test]
    async fn test_cloud_provider_without_webhook_is_unsupported() {
        let err = expect_err(factory().registry(&spec("example.com", PROVIDER_AWS)).await);
        assert!(matches!(err, ProviderError::Unsupported(ref p) if p == "aws"));
    }

    #[tokio::test]
    async fn test_cloud_provider_with_webhook_sidecar() {
        let mut s = spec("example.com", PROVIDER_CLOUDFLARE);
        s.webhook_url = Some("http://127.0.0.1:8888".to_string());
        assert!(factory().registry(&s).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_provider_is_invalid() {
        let err = expect_err(factory().registry(&spec("example.com", "route99")).await);
        assert!(matches!(err, ProviderError::InvalidConfiguration(_)));
    }
}
