// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistence for applications, their histories, and the decrypt audit log.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   applications.redb              # Applications + histories (ACID)
//!   audit/
//!     {date}/vault_decrypt.jsonl   # Daily decrypt audit logs
//! ```
//!
//! The lifecycle engine and the PII gateway depend on the
//! [`ApplicationRepository`] and [`DecryptAuditSink`] traits, not on the
//! concrete stores, so tests can substitute in-memory fakes.

use std::future::Future;
use std::sync::Arc;

pub mod application_db;
pub mod decrypt_log;
mod error;
pub mod files;
pub mod paths;

pub use application_db::ApplicationDatabase;
pub use decrypt_log::{DecryptAuditRepository, VaultDecryptLog};
pub use error::{StorageError, StorageResult};
pub use files::FileStorage;
pub use paths::StoragePaths;

use crate::models::{
    Application, ApplicationHistory, ApplicationStatus, HistoryEntry, NewApplication,
};

/// Persistence of applications and their append-only histories.
pub trait ApplicationRepository: Send + Sync {
    /// Fetch a live application. Soft-deleted rows read as `None`.
    fn get_by_id(
        &self,
        id: u64,
    ) -> impl Future<Output = StorageResult<Option<Application>>> + Send;

    /// Insert a new application in `screening` together with its first
    /// history row.
    fn create(
        &self,
        new: &NewApplication,
        entry: HistoryEntry,
    ) -> impl Future<Output = StorageResult<Application>> + Send;

    /// Move an application from `expected` to `next` and append `entry`,
    /// all or nothing.
    ///
    /// Fails with [`StorageError::StatusMismatch`] if the stored status is
    /// no longer `expected`, in which case nothing is written.
    fn apply_transition(
        &self,
        id: u64,
        expected: ApplicationStatus,
        next: ApplicationStatus,
        entry: HistoryEntry,
    ) -> impl Future<Output = StorageResult<Application>> + Send;

    /// All history rows for an application, oldest first.
    fn histories(
        &self,
        application_id: u64,
    ) -> impl Future<Output = StorageResult<Vec<ApplicationHistory>>> + Send;

    fn soft_delete(&self, id: u64) -> impl Future<Output = StorageResult<()>> + Send;
}

/// Destination for decrypt audit records.
pub trait DecryptAuditSink: Send + Sync {
    fn create(&self, log: &VaultDecryptLog) -> impl Future<Output = StorageResult<()>> + Send;
}

impl<T: DecryptAuditSink> DecryptAuditSink for Arc<T> {
    fn create(&self, log: &VaultDecryptLog) -> impl Future<Output = StorageResult<()>> + Send {
        (**self).create(log)
    }
}
