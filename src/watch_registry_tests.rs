// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `watch_registry.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::crd::SecretRef;
    use crate::test_support::{external_dns, FakeWatchSource};
    use futures::future::join_all;

    #[test]
    fn test_group_kind_keys() {
        assert_eq!(GroupKind::from(SourceKind::Node).key(), "Node.core");
        assert_eq!(GroupKind::from(SourceKind::Service).key(), "Service.core");
        assert_eq!(
            GroupKind::from(SourceKind::Ingress).key(),
            "Ingress.networking.k8s.io"
        );
    }

    #[tokio::test]
    async fn test_watch_without_source_is_noop() {
        let registry = WatchRegistry::new();
        registry
            .watch(&GroupKind::from(SourceKind::Service))
            .await
            .unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_watch_installs_once() {
        let source = Arc::new(FakeWatchSource::default());
        let registry = Arc::new(WatchRegistry::with_source(source.clone()));
        let kind = GroupKind::from(SourceKind::Service);

        let calls = (0..32).map(|_| {
            let registry = registry.clone();
            let kind = kind.clone();
            tokio::spawn(async move { registry.watch(&kind).await })
        });
        for result in join_all(calls).await {
            assert!(result.unwrap().is_ok());
        }

        assert_eq!(source.installs(&kind), 1);
        assert!(registry.is_watching(&kind));
    }

    #[tokio::test]
    async fn test_distinct_kinds_install_separately() {
        let source = Arc::new(FakeWatchSource::default());
        let registry = WatchRegistry::with_source(source.clone());

        for kind in [SourceKind::Node, SourceKind::Service, SourceKind::Ingress, SourceKind::Node] {
            registry.watch(&kind.into()).await.unwrap();
        }

        assert_eq!(registry.len(), 3);
        assert_eq!(source.installs(&SourceKind::Node.into()), 1);
    }

    #[tokio::test]
    async fn test_failed_install_rolls_back_and_retries() {
        let source = Arc::new(FakeWatchSource::failing_first(1));
        let registry = WatchRegistry::with_source(source.clone());
        let kind = GroupKind::from(SourceKind::Ingress);

        let err = registry.watch(&kind).await.unwrap_err();
        assert!(err.to_string().contains("Ingress.networking.k8s.io"));
        assert!(!registry.is_watching(&kind));

        registry.watch(&kind).await.unwrap();
        assert!(registry.is_watching(&kind));
        assert_eq!(source.installs(&kind), 2);
    }

    #[test]
    fn test_bind_only_once() {
        let registry = WatchRegistry::new();
        assert!(registry.bind(Arc::new(FakeWatchSource::default())));
        assert!(!registry.bind(Arc::new(FakeWatchSource::default())));
    }

    #[test]
    fn test_referencing_resources_filters_by_kind() {
        let resources = vec![
            Arc::new(external_dns("dns-system", "svc-zone", SourceKind::Service)),
            Arc::new(external_dns("dns-system", "node-zone", SourceKind::Node)),
            Arc::new(external_dns("team-a", "svc-zone-2", SourceKind::Service)),
        ];

        let refs = referencing_resources(&resources, &SourceKind::Service.into());
        let names: Vec<&str> = refs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["svc-zone", "svc-zone-2"]);
        assert_eq!(refs[1].namespace.as_deref(), Some("team-a"));
    }

    #[test]
    fn test_secret_referrers_match_namespace_and_name() {
        let mut with_secret = external_dns("dns-system", "aws-zone", SourceKind::Service);
        with_secret.spec.provider_secret_ref = Some(SecretRef {
            name: "aws-creds".to_string(),
        });
        let mut other_namespace = with_secret.clone();
        other_namespace.metadata.namespace = Some("team-a".to_string());
        let resources = vec![
            Arc::new(with_secret),
            Arc::new(other_namespace),
            Arc::new(external_dns("dns-system", "inmemory-zone", SourceKind::Service)),
        ];

        let refs = secret_referrers(&resources, Some("dns-system"), "aws-creds");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "aws-zone");
        assert!(secret_referrers(&resources, Some("dns-system"), "other").is_empty());
    }
}
