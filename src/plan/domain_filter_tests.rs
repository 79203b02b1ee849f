// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `domain_filter.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::test_support::spec;

    #[test]
    fn test_literal_filter_matches_apex_and_subdomains() {
        let filter = DomainFilter::literal(&["example.com".to_string()], &[]);
        assert!(filter.matches("example.com"));
        assert!(filter.matches("app.example.com."));
        assert!(filter.matches("APP.Example.com"));
        assert!(!filter.matches("badexample.com"));
        assert!(!filter.matches("example.org"));
    }

    #[test]
    fn test_leading_dot_matches_subdomains_only() {
        let filter = DomainFilter::literal(&[".example.com".to_string()], &[]);
        assert!(filter.matches("app.example.com"));
        assert!(!filter.matches("example.com"));
    }

    #[test]
    fn test_exclusion_wins_over_inclusion() {
        let filter = DomainFilter::literal(
            &["example.com".to_string()],
            &["internal.example.com".to_string()],
        );
        assert!(filter.matches("app.example.com"));
        assert!(!filter.matches("db.internal.example.com"));
    }

    #[test]
    fn test_empty_literal_filter_matches_everything() {
        let filter = DomainFilter::literal(&[], &[]);
        assert!(filter.matches("anything.test"));
    }

    #[test]
    fn test_regex_filter_with_exclusion() {
        let filter = DomainFilter::regex(r"\.example\.com$", Some(r"^staging\.")).unwrap();
        assert!(filter.matches("app.example.com"));
        assert!(!filter.matches("staging.example.com"));
        assert!(!filter.matches("app.example.org"));
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let err = DomainFilter::regex("(unclosed", None).unwrap_err();
        assert!(matches!(err, PlanError::InvalidDomainFilter(_)));
    }

    #[test]
    fn test_regex_takes_precedence_over_literal_lists() {
        let mut s = spec("example.com", "inmemory");
        s.domain_filter = vec!["example.com".to_string()];
        s.regex_domain_filter = Some(r"^api\.".to_string());

        let filter = DomainFilter::from_spec(&s).unwrap();
        assert!(filter.is_regex());
        // The literal list would accept this name; the regex does not.
        assert!(!filter.matches("www.example.com"));
        assert!(filter.matches("api.example.com"));
    }

    #[test]
    fn test_domain_is_implicit_filter() {
        let s = spec("example.com", "inmemory");
        let filter = DomainFilter::from_spec(&s).unwrap();
        assert!(!filter.is_regex());
        assert!(filter.matches("app.example.com"));
        assert!(!filter.matches("app.other.com"));
    }

    #[test]
    fn test_zone_id_filter_includes_zone() {
        let mut s = spec("example.com", "inmemory");
        s.zone = Some("Z123".to_string());
        let filter = ZoneIdFilter::from_spec(&s);
        assert!(filter.matches("Z123"));
        assert!(!filter.matches("Z999"));

        assert!(ZoneIdFilter::default().matches("Z999"));
    }
}
