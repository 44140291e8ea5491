// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication, or one
//! of the role extractors to require a specific role:
//!
//! ```rust,ignore
//! async fn approve(ScreeningAdmin(user): ScreeningAdmin) -> impl IntoResponse {
//!     // user.role is admin_screening or superadmin
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;

use super::{claims::JwtClaims, AuthError, AuthenticatedUser, Role};
use crate::state::{AppState, AuthConfig};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Extractor for authenticated users.
///
/// Validates the HS256 bearer token from the Authorization header.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Already verified by an earlier extractor in this request
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        let user = verify_jwt(token.trim(), &state.auth_config)?;
        parts.extensions.insert(user.clone());

        Ok(Auth(user))
    }
}

/// Verify an HS256 token and extract user information.
pub fn verify_jwt(token: &str, config: &AuthConfig) -> Result<AuthenticatedUser, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = CLOCK_SKEW_LEEWAY;
    validation.validate_aud = false;
    if let Some(ref issuer) = config.issuer {
        validation.set_issuer(&[issuer]);
    }

    let key = DecodingKey::from_secret(config.secret.expose_secret().as_bytes());
    let token_data = decode::<JwtClaims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        jsonwebtoken::errors::ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
        _ => AuthError::MalformedToken,
    })?;

    AuthenticatedUser::from_claims(token_data.claims)
}

/// Sign a token the way the identity service does.
#[cfg(test)]
pub(crate) fn issue_token(
    config: &AuthConfig,
    user_id: u64,
    role: Role,
    umkm_id: Option<u64>,
    ttl: std::time::Duration,
) -> Result<String, AuthError> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp();
    let claims = JwtClaims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        exp: now + ttl.as_secs() as i64,
        iat: now,
        iss: config.issuer.clone(),
        umkm_id,
    };
    let key = EncodingKey::from_secret(config.secret.expose_secret().as_bytes());
    encode(&Header::new(Algorithm::HS256), &claims, &key).map_err(|_| AuthError::MalformedToken)
}

async fn require(
    parts: &mut Parts,
    state: &AppState,
    allowed: impl Fn(&AuthenticatedUser) -> bool,
) -> Result<AuthenticatedUser, AuthError> {
    let Auth(user) = Auth::from_request_parts(parts, state).await?;
    if !allowed(&user) {
        return Err(AuthError::InsufficientPermissions);
    }
    Ok(user)
}

/// Any admin role, including superadmin.
pub struct AnyAdmin(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AnyAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require(parts, state, |u| u.is_admin()).await.map(AnyAdmin)
    }
}

/// `admin_screening` (or superadmin).
pub struct ScreeningAdmin(pub AuthenticatedUser);

impl FromRequestParts<AppState> for ScreeningAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require(parts, state, |u| u.has_role(Role::AdminScreening))
            .await
            .map(ScreeningAdmin)
    }
}

/// `admin_vendor` (or superadmin).
pub struct VendorAdmin(pub AuthenticatedUser);

impl FromRequestParts<AppState> for VendorAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require(parts, state, |u| u.has_role(Role::AdminVendor))
            .await
            .map(VendorAdmin)
    }
}

pub struct SuperadminOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for SuperadminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require(parts, state, |u| u.role == Role::Superadmin)
            .await
            .map(SuperadminOnly)
    }
}

/// Roles allowed to submit applications: `umkm` and superadmin.
pub struct Submitter(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Submitter {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require(parts, state, |u| u.has_role(Role::Umkm)).await.map(Submitter)
    }
}
