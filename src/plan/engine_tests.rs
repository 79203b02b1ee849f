// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `engine.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::errors::ProviderError;
    use crate::registry::TxtRegistry;
    use crate::test_support::{spec, RecordingRegistry};
    use std::sync::Arc;

    fn a(name: &str, ip: &str) -> Endpoint {
        Endpoint::new(name, RecordType::A, vec![ip.to_string()])
    }

    fn input(current: Vec<Endpoint>, desired: Vec<Endpoint>, missing: Vec<Endpoint>) -> PlanInput {
        PlanInput::from_spec(&spec("example.com", "inmemory"), current, desired, missing).unwrap()
    }

    #[tokio::test]
    async fn test_creates_desired_records() {
        let registry = RecordingRegistry::new();
        let outcome = PlanEngine
            .compute_and_apply(&registry, input(vec![], vec![a("app.example.com", "1.2.3.4")], vec![]))
            .await
            .unwrap();

        assert_eq!(outcome.created, 1);
        assert!(!outcome.is_up_to_date());
        assert_eq!(outcome.records, vec![a("app.example.com", "1.2.3.4")]);
        assert_eq!(registry.applied().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_change_set_makes_no_provider_call() {
        let registry = RecordingRegistry::new();
        let outcome = PlanEngine
            .compute_and_apply(
                &registry,
                input(
                    vec![a("app.example.com", "1.2.3.4")],
                    vec![a("app.example.com", "1.2.3.4")],
                    vec![],
                ),
            )
            .await
            .unwrap();

        assert!(outcome.is_up_to_date());
        assert_eq!(outcome.records.len(), 1);
        assert!(registry.applied().is_empty());
    }

    #[tokio::test]
    async fn test_missing_records_apply_before_sync_and_are_not_reproposed() {
        let registry = RecordingRegistry::new();
        let outcome = PlanEngine
            .compute_and_apply(
                &registry,
                input(
                    vec![],
                    vec![a("app.example.com", "1.2.3.4"), a("api.example.com", "5.6.7.8")],
                    vec![a("app.example.com", "1.2.3.4")],
                ),
            )
            .await
            .unwrap();

        let applied = registry.applied();
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[0].create, vec![a("app.example.com", "1.2.3.4")]);
        assert_eq!(applied[1].create, vec![a("api.example.com", "5.6.7.8")]);
        assert_eq!(outcome.created, 2);
    }

    #[tokio::test]
    async fn test_missing_records_already_present_are_skipped() {
        let registry = RecordingRegistry::new();
        PlanEngine
            .compute_and_apply(
                &registry,
                input(
                    vec![a("app.example.com", "1.2.3.4")],
                    vec![a("app.example.com", "1.2.3.4")],
                    vec![a("app.example.com", "1.2.3.4")],
                ),
            )
            .await
            .unwrap();
        assert!(registry.applied().is_empty());
    }

    #[tokio::test]
    async fn test_missing_stage_failure_names_stage() {
        let registry = RecordingRegistry::failing_after(0);
        let err = PlanEngine
            .compute_and_apply(
                &registry,
                input(vec![], vec![], vec![a("app.example.com", "1.2.3.4")]),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PlanError::Provider {
                stage: PlanStage::MissingRecords,
                source: ProviderError::ApplyChanges(_)
            }
        ));
    }

    #[tokio::test]
    async fn test_sync_stage_failure_after_missing_stage_succeeds() {
        let registry = RecordingRegistry::failing_after(1);
        let err = PlanEngine
            .compute_and_apply(
                &registry,
                input(
                    vec![],
                    vec![a("api.example.com", "5.6.7.8")],
                    vec![a("app.example.com", "1.2.3.4")],
                ),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("sync stage failed"));
        assert_eq!(registry.applied().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_only_never_deletes() {
        let registry = RecordingRegistry::new();
        let mut s = spec("example.com", "inmemory");
        s.policy = Policy::UpsertOnly;
        let outcome = PlanEngine
            .compute_and_apply(
                &registry,
                PlanInput::from_spec(
                    &s,
                    vec![a("old.example.com", "1.1.1.1")],
                    vec![a("new.example.com", "2.2.2.2")],
                    vec![],
                )
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.deleted, 0);
        assert_eq!(outcome.created, 1);
        assert!(registry.applied()[0].delete.is_empty());
    }

    #[tokio::test]
    async fn test_sync_through_txt_registry_is_idempotent() {
        let provider = Arc::new(crate::provider::inmemory::InMemoryProvider::with_zone(
            "example.com",
            "example.com",
        ));
        let registry = TxtRegistry::new(provider, Some("prod"), None);
        let s = spec("example.com", "inmemory");

        let first = PlanEngine
            .sync(&registry, &s, vec![a("app.example.com", "1.2.3.4")])
            .await
            .unwrap();
        assert_eq!(first.created, 1);

        let second = PlanEngine
            .sync(&registry, &s, vec![a("app.example.com", "1.2.3.4")])
            .await
            .unwrap();
        assert!(second.is_up_to_date());
        assert_eq!(second.records, first.records);
    }

    #[tokio::test]
    async fn test_typed_marker_from_missing_stage_survives_managed_txt() {
        use crate::provider::Provider;

        let provider = Arc::new(crate::provider::inmemory::InMemoryProvider::with_zone(
            "example.com",
            "example.com",
        ));
        let legacy_marker = Endpoint::new(
            "app.example.com",
            RecordType::TXT,
            vec!["\"heritage=external-dns,external-dns/owner=prod\"".to_string()],
        );
        provider
            .apply_changes(&Changes::creates(vec![a("app.example.com", "1.2.3.4"), legacy_marker]))
            .await
            .unwrap();

        let registry = TxtRegistry::new(provider.clone(), Some("prod"), None);
        let mut s = spec("example.com", "inmemory");
        s.managed_dns_record_types = vec!["A".to_string(), "TXT".to_string()];

        let first = PlanEngine
            .sync(&registry, &s, vec![a("app.example.com", "1.2.3.4")])
            .await
            .unwrap();
        assert_eq!(first.created, 1);
        assert_eq!(first.deleted, 0);

        let names: Vec<String> = provider
            .records()
            .await
            .unwrap()
            .iter()
            .map(|ep| format!("{} {}", ep.record_type.as_str(), ep.dns_name))
            .collect();
        assert!(names.contains(&"TXT a-app.example.com".to_string()), "{names:?}");
        assert!(names.contains(&"TXT app.example.com".to_string()), "{names:?}");

        let second = PlanEngine
            .sync(&registry, &s, vec![a("app.example.com", "1.2.3.4")])
            .await
            .unwrap();
        assert!(second.is_up_to_date());
    }
}
