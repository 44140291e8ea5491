// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Storage error type shared by the redb database and the file-backed audit log.

use std::io;

use crate::models::ApplicationStatus;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Compare-and-set failed: the row moved on since the caller read it.
    #[error("application {id} is {current}, expected {expected}")]
    StatusMismatch {
        id: u64,
        current: ApplicationStatus,
        expected: ApplicationStatus,
    },

    #[error("Storage not initialized")]
    NotInitialized,

    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
