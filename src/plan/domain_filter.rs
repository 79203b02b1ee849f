// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Domain and zone-id filters.
//!
//! A [`DomainFilter`] runs in exactly one mode per plan: when a regular
//! expression is configured it replaces the literal include/exclude lists
//! entirely.

use crate::crd::ExternalDNSSpec;
use crate::endpoint::normalize_name;
use crate::errors::PlanError;
use regex::Regex;

/// Restricts which DNS names a plan may touch.
#[derive(Clone, Debug)]
pub enum DomainFilter {
    /// Literal suffix lists. An empty include list matches every name.
    Literal {
        include: Vec<String>,
        exclude: Vec<String>,
    },
    /// Regular expression filter with an optional exclusion expression.
    Regex {
        include: Regex,
        exclude: Option<Regex>,
    },
}

impl DomainFilter {
    /// Literal filter from include and exclude lists.
    #[must_use]
    pub fn literal(include: &[String], exclude: &[String]) -> Self {
        DomainFilter::Literal {
            include: include.iter().map(|d| prepare(d)).filter(|d| !d.is_empty()).collect(),
            exclude: exclude.iter().map(|d| prepare(d)).filter(|d| !d.is_empty()).collect(),
        }
    }

    /// Regex filter.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidDomainFilter`] if either expression does not compile.
    pub fn regex(include: &str, exclude: Option<&str>) -> Result<Self, PlanError> {
        let include = Regex::new(include)
            .map_err(|e| PlanError::InvalidDomainFilter(format!("{include}: {e}")))?;
        let exclude = exclude
            .filter(|e| !e.is_empty())
            .map(|e| Regex::new(e).map_err(|err| PlanError::InvalidDomainFilter(format!("{e}: {err}"))))
            .transpose()?;
        Ok(DomainFilter::Regex { include, exclude })
    }

    /// Build the active filter for a resource.
    ///
    /// `regexDomainFilter` wins over the literal lists. With no filter at all
    /// the resource's own `domain` is used as the only include entry.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidDomainFilter`] for an invalid expression.
    pub fn from_spec(spec: &ExternalDNSSpec) -> Result<Self, PlanError> {
        if let Some(pattern) = spec.regex_domain_filter.as_deref().filter(|p| !p.is_empty()) {
            return Self::regex(pattern, spec.regex_domain_exclusion.as_deref());
        }

        if spec.domain_filter.is_empty() {
            Ok(Self::literal(std::slice::from_ref(&spec.domain), &spec.exclude_domains))
        } else {
            Ok(Self::literal(&spec.domain_filter, &spec.exclude_domains))
        }
    }

    /// Whether `name` is inside the filter.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        let name = normalize_name(name);
        match self {
            DomainFilter::Literal { include, exclude } => {
                if exclude.iter().any(|d| suffix_match(d, &name)) {
                    return false;
                }
                include.is_empty() || include.iter().any(|d| suffix_match(d, &name))
            }
            DomainFilter::Regex { include, exclude } => {
                if exclude.as_ref().is_some_and(|re| re.is_match(&name)) {
                    return false;
                }
                include.is_match(&name)
            }
        }
    }

    #[must_use]
    pub fn is_regex(&self) -> bool {
        matches!(self, DomainFilter::Regex { .. })
    }
}

fn prepare(domain: &str) -> String {
    let trimmed = domain.trim();
    if let Some(rest) = trimmed.strip_prefix('.') {
        format!(".{}", normalize_name(rest))
    } else {
        normalize_name(trimmed)
    }
}

// A leading dot matches subdomains only; otherwise the apex matches too.
fn suffix_match(filter: &str, name: &str) -> bool {
    if filter.starts_with('.') {
        return name.ends_with(filter);
    }
    name == filter || name.ends_with(&format!(".{filter}"))
}

/// Restricts which provider zones are considered, by zone id.
#[derive(Clone, Debug, Default)]
pub struct ZoneIdFilter {
    ids: Vec<String>,
}

impl ZoneIdFilter {
    #[must_use]
    pub fn new(ids: Vec<String>) -> Self {
        Self {
            ids: ids.into_iter().filter(|id| !id.is_empty()).collect(),
        }
    }

    /// Zone id filter for a resource: `zoneIdFilter` plus `zone` when set.
    #[must_use]
    pub fn from_spec(spec: &ExternalDNSSpec) -> Self {
        let mut ids = spec.zone_id_filter.clone();
        if let Some(zone) = &spec.zone {
            if !ids.contains(zone) {
                ids.push(zone.clone());
            }
        }
        Self::new(ids)
    }

    /// An empty filter matches every zone.
    #[must_use]
    pub fn matches(&self, zone_id: &str) -> bool {
        self.ids.is_empty() || self.ids.iter().any(|id| id == zone_id)
    }
}

#[cfg(test)]
#[path = "domain_filter_tests.rs"]
mod domain_filter_tests;
