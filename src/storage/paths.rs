// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the data directory layout.

use std::path::{Path, PathBuf};

/// Default base directory for persistent storage.
pub const DATA_ROOT: &str = "/data";

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// redb file holding applications and their histories.
    pub fn applications_db(&self) -> PathBuf {
        self.root.join("applications.redb")
    }

    // ========== Audit Paths ==========

    /// Directory containing audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Directory for a specific day's audit logs.
    pub fn audit_day_dir(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date)
    }

    /// Decrypt-attempt log for a specific day (JSONL).
    pub fn decrypt_log_file(&self, date: &str) -> PathBuf {
        self.audit_day_dir(date).join("vault_decrypt.jsonl")
    }
}
