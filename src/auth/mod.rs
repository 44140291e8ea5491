// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer JWT authentication for the admin API.
//!
//! ## Auth Flow
//!
//! 1. The UMKM identity service issues an HS256 token signed with `JWT_SECRET`
//! 2. Clients send `Authorization: Bearer <token>`
//! 3. This server verifies signature, expiry and (optionally) issuer, then
//!    extracts:
//!    - `sub` → numeric `user_id` (recorded as `actioned_by` / audit `user_id`)
//!    - `role` → [`Role`]
//!
//! ## Security
//!
//! - All non-health endpoints require authentication
//! - Each stage of the approval workflow has its own admin role;
//!   `superadmin` holds all of them
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod roles;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
#[cfg(test)]
pub(crate) use extractor::issue_token;
pub use extractor::{
    verify_jwt, AnyAdmin, Auth, ScreeningAdmin, Submitter, SuperadminOnly, VendorAdmin,
};
pub use roles::Role;
