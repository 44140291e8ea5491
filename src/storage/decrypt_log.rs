// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit log of PII decryption attempts.
//!
//! Every attempt, successful or not, becomes one JSON line in a daily file
//! under `audit/{date}/vault_decrypt.jsonl`. Records are never updated or
//! removed by the application.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use utoipa::ToSchema;

use super::{DecryptAuditSink, FileStorage, StorageError, StorageResult};

/// One decryption attempt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct VaultDecryptLog {
    /// Unique record ID.
    pub id: String,
    /// User who requested the plaintext.
    pub user_id: u64,
    /// UMKM the decrypted value belongs to, when known.
    pub umkm_id: Option<u64>,
    /// Logical field (`nik`, `kartu_number`).
    pub field_name: String,
    /// Table the ciphertext was read from.
    pub table_name: String,
    /// Row the ciphertext was read from.
    pub record_id: u64,
    /// Reason category, e.g. `profile_view`.
    pub purpose: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
    pub success: bool,
    /// Failure detail. Empty on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub decrypted_at: DateTime<Utc>,
}

impl VaultDecryptLog {
    pub fn date_key(&self) -> String {
        self.decrypted_at.format("%Y-%m-%d").to_string()
    }
}

/// File-backed decrypt audit repository.
pub struct DecryptAuditRepository {
    storage: FileStorage,
    // Serializes appends to the daily file.
    append_lock: Mutex<()>,
}

impl DecryptAuditRepository {
    pub fn new(storage: FileStorage) -> Self {
        Self {
            storage,
            append_lock: Mutex::new(()),
        }
    }

    /// Append one record to its day's log.
    pub async fn append(&self, log: &VaultDecryptLog) -> StorageResult<()> {
        let line = serde_json::to_vec(log)?;
        let path = self.storage.paths().decrypt_log_file(&log.date_key());

        let _guard = self.append_lock.lock().await;
        self.storage.append_line(&path, &line)
    }

    /// Read all records for a date (`YYYY-MM-DD`).
    pub fn read_logs(&self, date: &str) -> StorageResult<Vec<VaultDecryptLog>> {
        let path = self.storage.paths().decrypt_log_file(date);
        let content = self.storage.read_raw(&path)?;

        let content_str = String::from_utf8(content).map_err(|e| {
            StorageError::Serialization(format!("Invalid UTF-8 in decrypt log: {e}"))
        })?;

        let mut logs = Vec::new();
        for line in content_str.lines() {
            if line.trim().is_empty() {
                continue;
            }
            logs.push(serde_json::from_str(line)?);
        }

        Ok(logs)
    }

    /// Read records for an inclusive date range.
    pub fn read_logs_range(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> StorageResult<Vec<VaultDecryptLog>> {
        let start = parse_date(start_date)?;
        let end = parse_date(end_date)?;

        let mut all_logs = Vec::new();
        let mut current = start;

        while current <= end {
            let date_str = current.format("%Y-%m-%d").to_string();
            all_logs.extend(self.read_logs(&date_str)?);
            current = current
                .succ_opt()
                .ok_or_else(|| StorageError::Serialization("Date overflow".to_string()))?;
        }

        Ok(all_logs)
    }
}

impl DecryptAuditSink for DecryptAuditRepository {
    async fn create(&self, log: &VaultDecryptLog) -> StorageResult<()> {
        self.append(log).await
    }
}

fn parse_date(date: &str) -> StorageResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| StorageError::Serialization(format!("Invalid date {date}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DecryptAuditRepository) {
        let temp = TempDir::new().unwrap();
        let mut storage = FileStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        (temp, DecryptAuditRepository::new(storage))
    }

    fn sample(user_id: u64, record_id: u64, success: bool) -> VaultDecryptLog {
        VaultDecryptLog {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            umkm_id: Some(77),
            field_name: "nik".to_string(),
            table_name: "umkms".to_string(),
            record_id,
            purpose: "profile_view".to_string(),
            ip_address: Some("10.0.0.1".to_string()),
            user_agent: Some("test-agent".to_string()),
            request_id: Some("req-1".to_string()),
            success,
            error_message: (!success).then(|| "transit returned 500".to_string()),
            decrypted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_and_read_logs() {
        let (_temp, repo) = setup();

        repo.create(&sample(1, 10, true)).await.unwrap();
        repo.create(&sample(2, 11, false)).await.unwrap();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let logs = repo.read_logs(&today).unwrap();

        assert_eq!(logs.len(), 2);
        assert!(logs[0].success);
        assert!(!logs[1].success);
        assert_eq!(
            logs[1].error_message.as_deref(),
            Some("transit returned 500")
        );
    }

    #[tokio::test]
    async fn range_collects_each_day() {
        let (_temp, repo) = setup();

        let mut old = sample(1, 10, true);
        old.decrypted_at = Utc::now() - chrono::Duration::days(2);
        repo.create(&old).await.unwrap();
        repo.create(&sample(2, 11, true)).await.unwrap();

        let start = (Utc::now() - chrono::Duration::days(2)).format("%Y-%m-%d").to_string();
        let end = Utc::now().format("%Y-%m-%d").to_string();
        let logs = repo.read_logs_range(&start, &end).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].user_id, 1);
        assert_eq!(logs[1].user_id, 2);

        assert_eq!(repo.read_logs_range(&end, &end).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_appends_are_all_kept() {
        let (_temp, repo) = setup();
        let repo = Arc::new(repo);

        let mut handles = Vec::new();
        for i in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.create(&sample(i, i, true)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let today = Utc::now().format("%Y-%m-%d").to_string();
        assert_eq!(repo.read_logs(&today).unwrap().len(), 16);
    }

    #[test]
    fn empty_day_reads_empty() {
        let (_temp, repo) = setup();
        assert!(repo.read_logs("2001-01-01").unwrap().is_empty());
    }

    #[test]
    fn range_rejects_bad_dates() {
        let (_temp, repo) = setup();
        let result = repo.read_logs_range("yesterday", "2026-01-01");
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }
}
