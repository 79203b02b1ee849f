// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `registry.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::provider::inmemory::InMemoryProvider;

    fn zone() -> Arc<InMemoryProvider> {
        Arc::new(InMemoryProvider::with_zone("example.com", "example.com"))
    }

    fn a(name: &str, ip: &str) -> Endpoint {
        Endpoint::new(name, RecordType::A, vec![ip.to_string()])
    }

    #[test]
    fn test_parse_marker() {
        let labels = parse_marker(
            "\"heritage=external-dns,external-dns/owner=prod,external-dns/resource=service/default/web\"",
        )
        .unwrap();
        assert_eq!(labels.get(LABEL_OWNER).map(String::as_str), Some("prod"));
        assert_eq!(
            labels.get(LABEL_RESOURCE).map(String::as_str),
            Some("service/default/web")
        );

        assert!(parse_marker("v=spf1 include:example.net ~all").is_none());
        assert!(parse_marker("heritage=someone-else,external-dns/owner=prod").is_none());
    }

    #[tokio::test]
    async fn test_create_writes_both_markers() {
        let provider = zone();
        let registry = TxtRegistry::new(provider.clone(), Some("prod"), None);

        registry.records().await.unwrap();
        registry
            .apply_changes(&Changes::creates(vec![a("app.example.com", "1.2.3.4")]))
            .await
            .unwrap();

        let raw = provider.records().await.unwrap();
        let txt_names: Vec<&str> = raw
            .iter()
            .filter(|ep| ep.record_type == RecordType::TXT)
            .map(|ep| ep.dns_name.as_str())
            .collect();
        assert_eq!(txt_names.len(), 2);
        assert!(txt_names.contains(&"app.example.com"));
        assert!(txt_names.contains(&"a-app.example.com"));

        let records = registry.records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label(LABEL_OWNER), Some("prod"));
        assert!(registry.missing_records().is_empty());
    }

    #[tokio::test]
    async fn test_prefix_is_applied_to_marker_names() {
        let provider = zone();
        let registry = TxtRegistry::new(provider.clone(), Some("prod"), Some("_edns."));

        registry.records().await.unwrap();
        registry
            .apply_changes(&Changes::creates(vec![a("app.example.com", "1.2.3.4")]))
            .await
            .unwrap();

        let raw = provider.records().await.unwrap();
        assert!(raw.iter().any(|ep| ep.dns_name == "_edns.app.example.com"));
        assert!(raw.iter().any(|ep| ep.dns_name == "_edns.a-app.example.com"));
        assert_eq!(
            registry.records().await.unwrap()[0].label(LABEL_OWNER),
            Some("prod")
        );
    }

    #[tokio::test]
    async fn test_legacy_only_marker_yields_missing_typed_marker() {
        let provider = zone();
        provider
            .apply_changes(&Changes::creates(vec![
                a("app.example.com", "1.2.3.4"),
                Endpoint::new(
                    "app.example.com",
                    RecordType::TXT,
                    vec!["\"heritage=external-dns,external-dns/owner=prod\"".to_string()],
                ),
            ]))
            .await
            .unwrap();

        let registry = TxtRegistry::new(provider.clone(), Some("prod"), None);
        let records = registry.records().await.unwrap();
        assert_eq!(records[0].label(LABEL_OWNER), Some("prod"));

        let missing = registry.missing_records();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].dns_name, "a-app.example.com");
        assert_eq!(missing[0].record_type, RecordType::TXT);

        // Creating a missing marker passes through untouched.
        registry
            .apply_changes(&Changes::creates(missing))
            .await
            .unwrap();
        registry.records().await.unwrap();
        assert!(registry.missing_records().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_owner_is_not_reported_missing() {
        let provider = zone();
        provider
            .apply_changes(&Changes::creates(vec![
                a("app.example.com", "1.2.3.4"),
                Endpoint::new(
                    "app.example.com",
                    RecordType::TXT,
                    vec!["\"heritage=external-dns,external-dns/owner=other\"".to_string()],
                ),
            ]))
            .await
            .unwrap();

        let registry = TxtRegistry::new(provider, Some("prod"), None);
        let records = registry.records().await.unwrap();
        assert_eq!(records[0].label(LABEL_OWNER), Some("other"));
        assert!(registry.missing_records().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_markers() {
        let provider = zone();
        let registry = TxtRegistry::new(provider.clone(), Some("prod"), None);
        registry.records().await.unwrap();
        registry
            .apply_changes(&Changes::creates(vec![a("app.example.com", "1.2.3.4")]))
            .await
            .unwrap();

        let owned = registry.records().await.unwrap();
        registry
            .apply_changes(&Changes {
                delete: owned,
                ..Changes::default()
            })
            .await
            .unwrap();

        assert!(provider.records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_default_owner_id() {
        let registry = TxtRegistry::new(zone(), None, None);
        assert_eq!(registry.owner_id(), Some(DEFAULT_TXT_OWNER_ID));
    }

    #[tokio::test]
    async fn test_noop_registry_passes_through() {
        let provider = zone();
        let registry = NoopRegistry::new(provider.clone());
        registry
            .apply_changes(&Changes::creates(vec![a("app.example.com", "1.2.3.4")]))
            .await
            .unwrap();

        assert_eq!(provider.records().await.unwrap().len(), 1);
        assert_eq!(registry.records().await.unwrap().len(), 1);
        assert!(registry.owner_id().is_none());
        assert!(registry.missing_records().is_empty());
    }
}
