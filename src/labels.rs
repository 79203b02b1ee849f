// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Endpoint label keys and TXT ownership marker keys.
//!
//! Endpoint labels are controller-internal metadata attached to DNS records
//! (not Kubernetes labels). The TXT registry persists some of them inside
//! ownership markers so they survive across reconciles.

// ============================================================================
// Endpoint Labels
// ============================================================================

/// Endpoint label holding the owner id of a managed record
pub const LABEL_OWNER: &str = "owner";

/// Endpoint label naming the object that produced a record (e.g. `service/default/web`)
pub const LABEL_RESOURCE: &str = "resource";

/// Key of the owner entry inside a TXT ownership marker
pub const TXT_KEY_OWNER: &str = "external-dns/owner";

/// Key of the resource entry inside a TXT ownership marker
pub const TXT_KEY_RESOURCE: &str = "external-dns/resource";

/// Key of the heritage entry inside a TXT ownership marker
pub const TXT_KEY_HERITAGE: &str = "heritage";
