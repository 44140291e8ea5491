// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{AuthError, Role};

/// Claims carried by an access token issued by the UMKM identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: numeric user id.
    pub sub: String,

    /// One of `superadmin`, `admin_screening`, `admin_vendor`, `umkm`.
    pub role: String,

    /// Expiration timestamp
    pub exp: i64,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Business the user acts for. Required for `umkm` tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub umkm_id: Option<u64>,
}

/// Authenticated user information extracted from JWT.
///
/// This is the primary type used throughout the application to represent
/// the authenticated user making a request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub user_id: u64,

    pub role: Role,

    /// Business bound to an `umkm` user; `None` for admins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub umkm_id: Option<u64>,

    /// Token expiration (Unix timestamp, not serialized)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: JwtClaims) -> Result<Self, AuthError> {
        let user_id = claims
            .sub
            .parse::<u64>()
            .map_err(|_| AuthError::MalformedToken)?;
        let role = Role::parse(&claims.role).ok_or(AuthError::UnknownRole(claims.role))?;
        if role == Role::Umkm && claims.umkm_id.is_none() {
            return Err(AuthError::MalformedToken);
        }

        Ok(Self {
            user_id,
            role,
            umkm_id: claims.umkm_id,
            expires_at: claims.exp,
        })
    }

    /// Check if the user has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether this user may file applications for `umkm_id`.
    ///
    /// Superadmin may file for any business, an `umkm` user only for the
    /// one bound to its token.
    pub fn may_act_for(&self, umkm_id: u64) -> bool {
        match self.role {
            Role::Superadmin => true,
            Role::Umkm => self.umkm_id == Some(umkm_id),
            Role::AdminScreening | Role::AdminVendor => false,
        }
    }
}
