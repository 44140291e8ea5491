// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded application database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `applications`: application id → serialized Application
//! - `application_histories`: (application id, history id) → serialized ApplicationHistory
//! - `sequences`: sequence name → last issued id
//!
//! A status change and its history row are written in one write
//! transaction. redb admits a single writer at a time, so the status check
//! inside that transaction is an atomic compare-and-set: of two racing
//! transitions on the same application only the first can commit, and the
//! second observes the new status.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};

use super::{ApplicationRepository, StorageError, StorageResult};
use crate::models::{
    Application, ApplicationHistory, ApplicationStatus, HistoryEntry, NewApplication,
};

// =============================================================================
// Table Definitions
// =============================================================================

const APPLICATIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("applications");

/// Composite key keeps each application's histories contiguous and in
/// insertion order.
const HISTORIES: TableDefinition<(u64, u64), &[u8]> =
    TableDefinition::new("application_histories");

const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

const APPLICATION_SEQ: &str = "applications";
const HISTORY_SEQ: &str = "application_histories";

// =============================================================================
// ApplicationDatabase
// =============================================================================

pub struct ApplicationDatabase {
    db: Database,
}

impl ApplicationDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(APPLICATIONS)?;
            let _ = write_txn.open_table(HISTORIES)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Look up an application, including soft-deleted ones.
    pub fn load(&self, id: u64) -> StorageResult<Option<Application>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(APPLICATIONS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn insert_application(&self, new: &NewApplication, entry: HistoryEntry) -> StorageResult<Application> {
        let now = Utc::now();
        let write_txn = self.db.begin_write()?;
        let application = {
            let id = next_id(&write_txn, APPLICATION_SEQ)?;
            let application = Application {
                id,
                umkm_id: new.umkm_id,
                program_id: new.program_id,
                application_type: new.application_type,
                status: ApplicationStatus::Screening,
                submitted_at: now,
                expired_at: Application::expiry_for(now),
                updated_at: now,
                deleted_at: None,
            };

            let json = serde_json::to_vec(&application)?;
            let mut table = write_txn.open_table(APPLICATIONS)?;
            table.insert(id, json.as_slice())?;
            drop(table);

            insert_history(&write_txn, id, entry, now)?;
            application
        };
        write_txn.commit()?;
        Ok(application)
    }

    fn transition(
        &self,
        id: u64,
        expected: ApplicationStatus,
        next: ApplicationStatus,
        entry: HistoryEntry,
    ) -> StorageResult<Application> {
        let now = Utc::now();
        let write_txn = self.db.begin_write()?;
        let application = {
            let mut table = write_txn.open_table(APPLICATIONS)?;

            // Read existing value and deserialize before mutating
            let existing_bytes = {
                let existing = table
                    .get(id)?
                    .ok_or_else(|| StorageError::NotFound(format!("Application {id}")))?;
                existing.value().to_vec()
            };

            let mut application: Application = serde_json::from_slice(&existing_bytes)?;
            if application.is_deleted() {
                return Err(StorageError::NotFound(format!("Application {id}")));
            }
            if application.status != expected {
                return Err(StorageError::StatusMismatch {
                    id,
                    current: application.status,
                    expected,
                });
            }

            application.status = next;
            application.updated_at = now;

            let json = serde_json::to_vec(&application)?;
            table.insert(id, json.as_slice())?;
            drop(table);

            insert_history(&write_txn, id, entry, now)?;
            application
        };
        // Dropping an uncommitted transaction above aborts both writes.
        write_txn.commit()?;
        Ok(application)
    }

    fn list_histories(&self, application_id: u64) -> StorageResult<Vec<ApplicationHistory>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(HISTORIES)?;

        let mut histories = Vec::new();
        for entry in table.range((application_id, 0)..=(application_id, u64::MAX))? {
            let (_, value) = entry?;
            histories.push(serde_json::from_slice(value.value())?);
        }
        Ok(histories)
    }

    fn mark_deleted(&self, id: u64) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(APPLICATIONS)?;
            let existing_bytes = {
                let existing = table
                    .get(id)?
                    .ok_or_else(|| StorageError::NotFound(format!("Application {id}")))?;
                existing.value().to_vec()
            };

            let mut application: Application = serde_json::from_slice(&existing_bytes)?;
            if application.is_deleted() {
                return Err(StorageError::NotFound(format!("Application {id}")));
            }
            application.deleted_at = Some(Utc::now());

            let json = serde_json::to_vec(&application)?;
            table.insert(id, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

impl ApplicationRepository for ApplicationDatabase {
    async fn get_by_id(&self, id: u64) -> StorageResult<Option<Application>> {
        Ok(self.load(id)?.filter(|app| !app.is_deleted()))
    }

    async fn create(&self, new: &NewApplication, entry: HistoryEntry) -> StorageResult<Application> {
        self.insert_application(new, entry)
    }

    async fn apply_transition(
        &self,
        id: u64,
        expected: ApplicationStatus,
        next: ApplicationStatus,
        entry: HistoryEntry,
    ) -> StorageResult<Application> {
        self.transition(id, expected, next, entry)
    }

    async fn histories(&self, application_id: u64) -> StorageResult<Vec<ApplicationHistory>> {
        self.list_histories(application_id)
    }

    async fn soft_delete(&self, id: u64) -> StorageResult<()> {
        self.mark_deleted(id)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn next_id(txn: &WriteTransaction, sequence: &str) -> StorageResult<u64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let next = table.get(sequence)?.map(|v| v.value()).unwrap_or(0) + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

fn insert_history(
    txn: &WriteTransaction,
    application_id: u64,
    entry: HistoryEntry,
    actioned_at: DateTime<Utc>,
) -> StorageResult<ApplicationHistory> {
    let id = next_id(txn, HISTORY_SEQ)?;
    let history = ApplicationHistory {
        id,
        application_id,
        status: entry.action,
        notes: entry.notes,
        actioned_at,
        actioned_by: entry.actioned_by,
    };

    let json = serde_json::to_vec(&history)?;
    let mut table = txn.open_table(HISTORIES)?;
    table.insert((application_id, id), json.as_slice())?;
    Ok(history)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApplicationType, HistoryAction};
    use std::sync::Arc;

    fn temp_db() -> (ApplicationDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = ApplicationDatabase::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn new_application() -> NewApplication {
        NewApplication {
            umkm_id: 5,
            program_id: 9,
            application_type: ApplicationType::Training,
        }
    }

    fn submit_entry() -> HistoryEntry {
        HistoryEntry {
            action: HistoryAction::Submit,
            notes: "Application submitted".to_string(),
            actioned_by: Some(5),
        }
    }

    fn approve_entry(actor: u64) -> HistoryEntry {
        HistoryEntry {
            action: HistoryAction::ApproveByAdminScreening,
            notes: "Approved by admin screening".to_string(),
            actioned_by: Some(actor),
        }
    }

    #[tokio::test]
    async fn create_assigns_ids_and_submit_history() {
        let (db, _dir) = temp_db();

        let first = db.create(&new_application(), submit_entry()).await.unwrap();
        let second = db.create(&new_application(), submit_entry()).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.status, ApplicationStatus::Screening);
        assert_eq!(first.expired_at, Application::expiry_for(first.submitted_at));

        let histories = db.histories(first.id).await.unwrap();
        assert_eq!(histories.len(), 1);
        assert_eq!(histories[0].status, HistoryAction::Submit);
        assert_eq!(histories[0].actioned_at, first.submitted_at);
    }

    #[tokio::test]
    async fn transition_updates_status_and_appends_history() {
        let (db, _dir) = temp_db();
        let app = db.create(&new_application(), submit_entry()).await.unwrap();

        let updated = db
            .apply_transition(
                app.id,
                ApplicationStatus::Screening,
                ApplicationStatus::Final,
                approve_entry(1),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, ApplicationStatus::Final);

        let loaded = db.get_by_id(app.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ApplicationStatus::Final);
        assert_eq!(loaded.submitted_at, app.submitted_at);
        assert_eq!(loaded.expired_at, app.expired_at);

        let histories = db.histories(app.id).await.unwrap();
        assert_eq!(histories.len(), 2);
        let last = histories.last().unwrap();
        assert_eq!(last.status, HistoryAction::ApproveByAdminScreening);
        assert_eq!(last.actioned_by, Some(1));
        assert_eq!(last.actioned_at, loaded.updated_at);
    }

    #[tokio::test]
    async fn stale_expected_status_writes_nothing() {
        let (db, _dir) = temp_db();
        let app = db.create(&new_application(), submit_entry()).await.unwrap();

        let result = db
            .apply_transition(
                app.id,
                ApplicationStatus::Final,
                ApplicationStatus::Approved,
                approve_entry(1),
            )
            .await;
        assert!(matches!(
            result,
            Err(StorageError::StatusMismatch {
                current: ApplicationStatus::Screening,
                expected: ApplicationStatus::Final,
                ..
            })
        ));

        let loaded = db.get_by_id(app.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ApplicationStatus::Screening);
        assert_eq!(db.histories(app.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_application_is_not_found() {
        let (db, _dir) = temp_db();
        assert!(db.get_by_id(42).await.unwrap().is_none());

        let result = db
            .apply_transition(
                42,
                ApplicationStatus::Screening,
                ApplicationStatus::Final,
                approve_entry(1),
            )
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn soft_delete_hides_application_but_keeps_histories() {
        let (db, _dir) = temp_db();
        let app = db.create(&new_application(), submit_entry()).await.unwrap();

        db.soft_delete(app.id).await.unwrap();

        assert!(db.get_by_id(app.id).await.unwrap().is_none());
        assert!(db.load(app.id).unwrap().unwrap().deleted_at.is_some());
        assert_eq!(db.histories(app.id).await.unwrap().len(), 1);

        assert!(matches!(
            db.soft_delete(app.id).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            db.apply_transition(
                app.id,
                ApplicationStatus::Screening,
                ApplicationStatus::Final,
                approve_entry(1),
            )
            .await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn histories_are_scoped_per_application() {
        let (db, _dir) = temp_db();
        let a = db.create(&new_application(), submit_entry()).await.unwrap();
        let b = db.create(&new_application(), submit_entry()).await.unwrap();

        db.apply_transition(
            b.id,
            ApplicationStatus::Screening,
            ApplicationStatus::Final,
            approve_entry(3),
        )
        .await
        .unwrap();

        assert_eq!(db.histories(a.id).await.unwrap().len(), 1);
        assert_eq!(db.histories(b.id).await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_transitions_admit_one_winner() {
        let (db, _dir) = temp_db();
        let db = Arc::new(db);
        let app = db.create(&new_application(), submit_entry()).await.unwrap();

        let mut handles = Vec::new();
        for actor in 0..8u64 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.apply_transition(
                    app.id,
                    ApplicationStatus::Screening,
                    ApplicationStatus::Final,
                    approve_entry(actor),
                )
                .await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(StorageError::StatusMismatch { current, .. }) => {
                    assert_eq!(current, ApplicationStatus::Final)
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(db.histories(app.id).await.unwrap().len(), 2);
    }

    #[test]
    fn reopen_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.redb");
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();

        let id = {
            let db = ApplicationDatabase::open(&path).unwrap();
            rt.block_on(db.create(&new_application(), submit_entry()))
                .unwrap()
                .id
        };

        let db = ApplicationDatabase::open(&path).unwrap();
        let loaded = rt.block_on(db.get_by_id(id)).unwrap().unwrap();
        assert_eq!(loaded.umkm_id, 5);
        let next = rt.block_on(db.create(&new_application(), submit_entry())).unwrap();
        assert_eq!(next.id, id + 1);
    }
}
