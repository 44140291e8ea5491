// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `Superadmin` - Every admin privilege, plus deletion and audit access
/// - `AdminScreening` - Decides applications in `screening`
/// - `AdminVendor` - Decides applications in `final`
/// - `Umkm` - Business owner submitting applications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Superadmin,
    AdminScreening,
    AdminVendor,
    Umkm,
}

impl Role {
    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        match (self, required) {
            (Role::Superadmin, _) => true,
            (Role::AdminScreening, Role::AdminScreening) => true,
            (Role::AdminVendor, Role::AdminVendor) => true,
            (Role::Umkm, Role::Umkm) => true,
            _ => false,
        }
    }

    pub fn is_admin(&self) -> bool {
        !matches!(self, Role::Umkm)
    }

    /// Parse role from a token claim (case-insensitive).
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "superadmin" => Some(Role::Superadmin),
            "admin_screening" => Some(Role::AdminScreening),
            "admin_vendor" => Some(Role::AdminVendor),
            "umkm" => Some(Role::Umkm),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Superadmin => "superadmin",
            Role::AdminScreening => "admin_screening",
            Role::AdminVendor => "admin_vendor",
            Role::Umkm => "umkm",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
