// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Synchronization policies.

use super::Changes;
use crate::crd::Policy;

impl Policy {
    /// Drop every change the policy does not permit.
    ///
    /// - `sync`: creates, updates and deletes
    /// - `upsert-only`: creates and updates
    /// - `create-only`: creates
    #[must_use]
    pub fn apply(&self, changes: Changes) -> Changes {
        match self {
            Policy::Sync => changes,
            Policy::UpsertOnly => Changes {
                delete: Vec::new(),
                ..changes
            },
            Policy::CreateOnly => Changes {
                create: changes.create,
                ..Changes::default()
            },
        }
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod policy_tests;
