// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Application Data Models
//!
//! Domain types for UMKM program applications and their audit trail. All
//! types derive `Serialize`, `Deserialize`, and `ToSchema` so the API layer
//! can hand them out directly.
//!
//! ## Model Categories
//!
//! - **Applications**: one submission by one UMKM against one program
//! - **Histories**: append-only record of every lifecycle event
//! - **Decisions**: admin payloads for reject/revise transitions

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Days between submission and expiry of an application.
pub const APPLICATION_VALIDITY_DAYS: i64 = 30;

// =============================================================================
// Enumerations
// =============================================================================

/// Kind of program an application targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    Training,
    Certification,
    Funding,
}

/// Current lifecycle status of an application.
///
/// ```text
/// screening --approve--> final --approve--> approved
///     |                    |
///     +--reject--> rejected <--reject--+
///     +--revise--> revised
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    /// Awaiting the screening admin. Initial status.
    Screening,
    /// Sent back to the UMKM for corrections.
    Revised,
    /// Passed screening, awaiting the vendor admin.
    Final,
    /// Accepted into the program.
    Approved,
    /// Declined at either stage.
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Screening,
        ApplicationStatus::Revised,
        ApplicationStatus::Final,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Screening => "screening",
            ApplicationStatus::Revised => "revised",
            ApplicationStatus::Final => "final",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label recorded on a history row.
///
/// This is the action taken, not the resulting status: a screening reject
/// and a vendor reject both land in `rejected` but are recorded differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Submit,
    ApproveByAdminScreening,
    RejectByAdminScreening,
    Revise,
    ApproveByAdminVendor,
    RejectByAdminVendor,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Submit => "submit",
            HistoryAction::ApproveByAdminScreening => "approve_by_admin_screening",
            HistoryAction::RejectByAdminScreening => "reject_by_admin_screening",
            HistoryAction::Revise => "revise",
            HistoryAction::ApproveByAdminVendor => "approve_by_admin_vendor",
            HistoryAction::RejectByAdminVendor => "reject_by_admin_vendor",
        }
    }
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Application
// =============================================================================

/// A program application submitted by a UMKM.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Application {
    /// Numeric identifier assigned at creation.
    pub id: u64,
    /// Owning UMKM.
    pub umkm_id: u64,
    /// Target program.
    pub program_id: u64,
    /// Program kind.
    #[serde(rename = "type")]
    pub application_type: ApplicationType,
    /// Current lifecycle status.
    pub status: ApplicationStatus,
    /// When the UMKM submitted.
    pub submitted_at: DateTime<Utc>,
    /// `submitted_at` + 30 days. Never changes after creation.
    pub expired_at: DateTime<Utc>,
    /// Timestamp of the latest history row.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Application {
    /// Expiry for an application submitted at `submitted_at`.
    pub fn expiry_for(submitted_at: DateTime<Utc>) -> DateTime<Utc> {
        submitted_at + Duration::days(APPLICATION_VALIDITY_DAYS)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Input for a new submission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewApplication {
    pub umkm_id: u64,
    pub program_id: u64,
    #[serde(rename = "type")]
    pub application_type: ApplicationType,
}

// =============================================================================
// History
// =============================================================================

/// One immutable lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ApplicationHistory {
    pub id: u64,
    pub application_id: u64,
    /// Action taken.
    pub status: HistoryAction,
    pub notes: String,
    pub actioned_at: DateTime<Utc>,
    /// `None` for system-generated entries.
    pub actioned_by: Option<u64>,
}

/// History row to be written alongside a status change.
///
/// The repository assigns the id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub action: HistoryAction,
    pub notes: String,
    pub actioned_by: Option<u64>,
}

// =============================================================================
// Decisions
// =============================================================================

/// Admin decision carrying mandatory notes (reject/revise).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Decision {
    pub application_id: u64,
    pub notes: String,
}

/// Request body for reject/revise endpoints; the id comes from the path.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DecisionRequest {
    #[serde(default)]
    pub notes: String,
}

/// Minimal view returned after a transition.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct TransitionResponse {
    pub id: u64,
    pub status: ApplicationStatus,
}

impl From<&Application> for TransitionResponse {
    fn from(app: &Application) -> Self {
        Self {
            id: app.id,
            status: app.status,
        }
    }
}

/// Application detail with its audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationDetail {
    pub application: Application,
    pub histories: Vec<ApplicationHistory>,
}
