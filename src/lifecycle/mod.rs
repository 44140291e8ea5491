// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Application Lifecycle Engine
//!
//! Every status change goes through [`LifecycleEngine`]. Each operation:
//!
//! 1. Validates caller input (reject/revise notes) without touching storage
//! 2. Loads the application (`NotFound` if absent or soft-deleted)
//! 3. Checks the transition guard against the persisted status
//! 4. Writes the new status and its history row as one atomic unit
//!
//! The repository re-checks the status inside the write, so when two
//! transitions race on one application only one commits and the other
//! fails with `InvalidState` carrying the status it lost to.

use tracing::{info, warn};

use crate::context::OpContext;
use crate::error::CoreError;
use crate::models::{
    Application, ApplicationDetail, Decision, HistoryAction, HistoryEntry, NewApplication,
};
use crate::storage::ApplicationRepository;

pub mod transition;

pub use transition::Transition;

const SUBMIT_NOTES: &str = "Application submitted";

pub struct LifecycleEngine<R> {
    repo: R,
}

impl<R: ApplicationRepository> LifecycleEngine<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Create an application in `screening` with its `submit` history row.
    pub async fn submit(
        &self,
        ctx: &OpContext,
        actor: u64,
        new: NewApplication,
    ) -> Result<Application, CoreError> {
        ctx.check()?;
        if new.umkm_id == 0 {
            return Err(CoreError::Validation("umkm_id is required".to_string()));
        }
        if new.program_id == 0 {
            return Err(CoreError::Validation("program_id is required".to_string()));
        }

        let entry = HistoryEntry {
            action: HistoryAction::Submit,
            notes: SUBMIT_NOTES.to_string(),
            actioned_by: Some(actor),
        };
        let application = ctx.run(self.repo.create(&new, entry)).await??;

        info!(
            application_id = application.id,
            umkm_id = application.umkm_id,
            program_id = application.program_id,
            actor = actor,
            "Application submitted"
        );
        Ok(application)
    }

    /// `screening` → `final`.
    pub async fn screening_approve(
        &self,
        ctx: &OpContext,
        actor: u64,
        application_id: u64,
    ) -> Result<Application, CoreError> {
        self.transition(ctx, actor, application_id, Transition::ScreeningApprove, None)
            .await
    }

    /// `screening` → `rejected`. Notes are mandatory.
    pub async fn screening_reject(
        &self,
        ctx: &OpContext,
        actor: u64,
        decision: Decision,
    ) -> Result<Application, CoreError> {
        self.transition(
            ctx,
            actor,
            decision.application_id,
            Transition::ScreeningReject,
            Some(&decision.notes),
        )
        .await
    }

    /// `screening` → `revised`. Notes are mandatory.
    pub async fn screening_revise(
        &self,
        ctx: &OpContext,
        actor: u64,
        decision: Decision,
    ) -> Result<Application, CoreError> {
        self.transition(
            ctx,
            actor,
            decision.application_id,
            Transition::ScreeningRevise,
            Some(&decision.notes),
        )
        .await
    }

    /// `final` → `approved`.
    pub async fn final_approve(
        &self,
        ctx: &OpContext,
        actor: u64,
        application_id: u64,
    ) -> Result<Application, CoreError> {
        self.transition(ctx, actor, application_id, Transition::FinalApprove, None)
            .await
    }

    /// `final` → `rejected`. Notes are mandatory.
    pub async fn final_reject(
        &self,
        ctx: &OpContext,
        actor: u64,
        decision: Decision,
    ) -> Result<Application, CoreError> {
        self.transition(
            ctx,
            actor,
            decision.application_id,
            Transition::FinalReject,
            Some(&decision.notes),
        )
        .await
    }

    pub async fn get_with_histories(
        &self,
        ctx: &OpContext,
        application_id: u64,
    ) -> Result<ApplicationDetail, CoreError> {
        ctx.check()?;
        let application = self.load(ctx, application_id).await?;
        let histories = ctx.run(self.repo.histories(application_id)).await??;
        Ok(ApplicationDetail {
            application,
            histories,
        })
    }

    /// Soft delete. Histories stay readable through the repository.
    pub async fn delete(&self, ctx: &OpContext, application_id: u64) -> Result<(), CoreError> {
        ctx.check()?;
        ctx.run(self.repo.soft_delete(application_id)).await??;
        info!(application_id = application_id, "Application soft-deleted");
        Ok(())
    }

    async fn load(&self, ctx: &OpContext, application_id: u64) -> Result<Application, CoreError> {
        ctx.run(self.repo.get_by_id(application_id))
            .await??
            .ok_or_else(|| CoreError::NotFound(format!("Application {application_id}")))
    }

    async fn transition(
        &self,
        ctx: &OpContext,
        actor: u64,
        application_id: u64,
        transition: Transition,
        notes: Option<&str>,
    ) -> Result<Application, CoreError> {
        let result = self
            .try_transition(ctx, actor, application_id, transition, notes)
            .await;

        match &result {
            Ok(application) => info!(
                application_id = application_id,
                actor = actor,
                transition = %transition,
                from = %transition.required_status(),
                to = %application.status,
                "Application transitioned"
            ),
            Err(e) => warn!(
                application_id = application_id,
                actor = actor,
                transition = %transition,
                error = %e,
                "Application transition refused"
            ),
        }
        result
    }

    async fn try_transition(
        &self,
        ctx: &OpContext,
        actor: u64,
        application_id: u64,
        transition: Transition,
        notes: Option<&str>,
    ) -> Result<Application, CoreError> {
        ctx.check()?;

        let notes = match transition.fixed_notes() {
            Some(fixed) => fixed.to_string(),
            None => {
                let notes = notes.map(str::trim).unwrap_or_default();
                if notes.is_empty() {
                    return Err(CoreError::Validation(format!(
                        "notes are required for {}",
                        transition.action()
                    )));
                }
                notes.to_string()
            }
        };

        let application = self.load(ctx, application_id).await?;

        let current = application.status;
        let Some(next) = current.apply(transition) else {
            return Err(CoreError::InvalidState {
                id: application_id,
                current,
                expected: transition.required_status(),
            });
        };

        let entry = HistoryEntry {
            action: transition.action(),
            notes,
            actioned_by: Some(actor),
        };
        let updated = ctx
            .run(self.repo.apply_transition(application_id, current, next, entry))
            .await??;
        Ok(updated)
    }
}
