// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transition table for the application state machine.
//!
//! | Transition         | From        | To         | History action               | Notes    |
//! |--------------------|-------------|------------|------------------------------|----------|
//! | `ScreeningApprove` | `screening` | `final`    | `approve_by_admin_screening` | fixed    |
//! | `ScreeningReject`  | `screening` | `rejected` | `reject_by_admin_screening`  | required |
//! | `ScreeningRevise`  | `screening` | `revised`  | `revise`                     | required |
//! | `FinalApprove`     | `final`     | `approved` | `approve_by_admin_vendor`    | fixed    |
//! | `FinalReject`      | `final`     | `rejected` | `reject_by_admin_vendor`     | required |

use crate::models::{ApplicationStatus, HistoryAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    ScreeningApprove,
    ScreeningReject,
    ScreeningRevise,
    FinalApprove,
    FinalReject,
}

impl Transition {
    pub const ALL: [Transition; 5] = [
        Transition::ScreeningApprove,
        Transition::ScreeningReject,
        Transition::ScreeningRevise,
        Transition::FinalApprove,
        Transition::FinalReject,
    ];

    /// Status the application must be in.
    pub fn required_status(&self) -> ApplicationStatus {
        match self {
            Transition::ScreeningApprove
            | Transition::ScreeningReject
            | Transition::ScreeningRevise => ApplicationStatus::Screening,
            Transition::FinalApprove | Transition::FinalReject => ApplicationStatus::Final,
        }
    }

    pub fn target_status(&self) -> ApplicationStatus {
        match self {
            Transition::ScreeningApprove => ApplicationStatus::Final,
            Transition::ScreeningReject | Transition::FinalReject => ApplicationStatus::Rejected,
            Transition::ScreeningRevise => ApplicationStatus::Revised,
            Transition::FinalApprove => ApplicationStatus::Approved,
        }
    }

    pub fn action(&self) -> HistoryAction {
        match self {
            Transition::ScreeningApprove => HistoryAction::ApproveByAdminScreening,
            Transition::ScreeningReject => HistoryAction::RejectByAdminScreening,
            Transition::ScreeningRevise => HistoryAction::Revise,
            Transition::FinalApprove => HistoryAction::ApproveByAdminVendor,
            Transition::FinalReject => HistoryAction::RejectByAdminVendor,
        }
    }

    /// Notes written for transitions that don't take caller notes.
    pub fn fixed_notes(&self) -> Option<&'static str> {
        match self {
            Transition::ScreeningApprove => Some("Approved by admin screening"),
            Transition::FinalApprove => Some("Approved by admin vendor"),
            _ => None,
        }
    }

    pub fn requires_notes(&self) -> bool {
        self.fixed_notes().is_none()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::ScreeningApprove => "screening_approve",
            Transition::ScreeningReject => "screening_reject",
            Transition::ScreeningRevise => "screening_revise",
            Transition::FinalApprove => "final_approve",
            Transition::FinalReject => "final_reject",
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ApplicationStatus {
    /// Status after `transition`, or `None` if it is not legal from here.
    pub fn apply(self, transition: Transition) -> Option<ApplicationStatus> {
        (self == transition.required_status()).then(|| transition.target_status())
    }

    /// No transition leaves this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Revised | ApplicationStatus::Approved | ApplicationStatus::Rejected
        )
    }
}
