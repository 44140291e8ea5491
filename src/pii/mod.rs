// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Sensitive Field Handling
//!
//! UMKM owners' national ID (NIK) and card numbers are stored only as
//! transit ciphertext. Turning them back into plaintext goes through
//! [`EncryptedFieldGateway::decrypt`], which writes a decrypt audit record
//! for every attempt.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::CoreError;

pub mod gateway;

pub use gateway::EncryptedFieldGateway;

pub const DEFAULT_TRANSIT_MOUNT: &str = "transit";
pub const DEFAULT_NIK_KEY: &str = "umkm-nik";
pub const DEFAULT_KARTU_KEY: &str = "umkm-kartu";

/// PII field kinds. Each maps to its own transit key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveField {
    /// Nomor Induk Kependudukan (national ID).
    Nik,
    KartuNumber,
}

impl SensitiveField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensitiveField::Nik => "nik",
            SensitiveField::KartuNumber => "kartu_number",
        }
    }
}

impl std::fmt::Display for SensitiveField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transit mount and per-field key names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitKeys {
    mount_path: String,
    nik_key: String,
    kartu_key: String,
}

impl Default for TransitKeys {
    fn default() -> Self {
        Self {
            mount_path: DEFAULT_TRANSIT_MOUNT.to_string(),
            nik_key: DEFAULT_NIK_KEY.to_string(),
            kartu_key: DEFAULT_KARTU_KEY.to_string(),
        }
    }
}

impl TransitKeys {
    /// Fails if any name is blank or both fields would share one key.
    pub fn new(
        mount_path: impl Into<String>,
        nik_key: impl Into<String>,
        kartu_key: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let keys = Self {
            mount_path: mount_path.into().trim().to_string(),
            nik_key: nik_key.into().trim().to_string(),
            kartu_key: kartu_key.into().trim().to_string(),
        };

        if keys.mount_path.is_empty() || keys.nik_key.is_empty() || keys.kartu_key.is_empty() {
            return Err(CoreError::Validation(
                "transit mount and key names must not be empty".to_string(),
            ));
        }
        if keys.nik_key == keys.kartu_key {
            return Err(CoreError::Validation(format!(
                "nik and kartu_number must use distinct transit keys, both are {}",
                keys.nik_key
            )));
        }

        Ok(keys)
    }

    pub fn mount_path(&self) -> &str {
        &self.mount_path
    }

    pub fn key_for(&self, field: SensitiveField) -> &str {
        match field {
            SensitiveField::Nik => &self.nik_key,
            SensitiveField::KartuNumber => &self.kartu_key,
        }
    }
}

/// Who is decrypting what, and why. Recorded verbatim in the audit log.
#[derive(Debug, Clone)]
pub struct DecryptParams {
    pub user_id: u64,
    pub umkm_id: Option<u64>,
    pub field: SensitiveField,
    pub table_name: String,
    pub record_id: u64,
    pub purpose: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
