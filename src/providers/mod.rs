// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External key-management providers.
//!
//! The application never holds raw key material. Sensitive fields are sent
//! to a transit-encryption service which returns an opaque ciphertext
//! string (e.g. `vault:v1:...`) and reverses it on request.

use std::future::Future;

pub mod vault_transit;

pub use vault_transit::VaultTransitClient;

#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    #[error("transit request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transit returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transit response was invalid: {0}")]
    InvalidResponse(String),

    #[error("transit configuration invalid: {0}")]
    InvalidConfig(String),
}

/// Encrypt/decrypt through a named key on a transit mount.
///
/// Ciphertext is opaque. The only contract is that a ciphertext produced by
/// `encrypt` decrypts back to the same bytes under the same mount and key.
pub trait TransitEncryption: Send + Sync {
    fn encrypt(
        &self,
        mount: &str,
        key: &str,
        plaintext: &[u8],
    ) -> impl Future<Output = Result<String, TransitError>> + Send;

    fn decrypt(
        &self,
        mount: &str,
        key: &str,
        ciphertext: &str,
    ) -> impl Future<Output = Result<Vec<u8>, TransitError>> + Send;
}
