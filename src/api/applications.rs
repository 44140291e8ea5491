// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Application submission and the two-stage approval workflow.
//!
//! Screening endpoints require `admin_screening`, final endpoints require
//! `admin_vendor`; superadmin may call either.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::warn;

use super::meta::RequestMeta;
use crate::{
    auth::{AnyAdmin, ScreeningAdmin, Submitter, SuperadminOnly, VendorAdmin},
    error::ApiError,
    models::{Application, ApplicationDetail, Decision, DecisionRequest, NewApplication, TransitionResponse},
    state::AppState,
};

/// Submit an application.
///
/// Creates the application in `screening` and records a `submit` history row.
/// An `umkm` caller may only submit for the business bound to its token.
#[utoipa::path(
    post,
    path = "/v1/applications",
    tag = "Applications",
    request_body = NewApplication,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Application created", body = Application),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (umkm or superadmin required, or umkm_id is not the caller's business)")
    )
)]
pub async fn submit_application(
    Submitter(user): Submitter,
    meta: RequestMeta,
    State(state): State<AppState>,
    Json(request): Json<NewApplication>,
) -> Result<(StatusCode, Json<Application>), ApiError> {
    if !user.may_act_for(request.umkm_id) {
        warn!(
            user_id = user.user_id,
            token_umkm_id = ?user.umkm_id,
            requested_umkm_id = request.umkm_id,
            "Submission for another business refused"
        );
        return Err(ApiError::forbidden(
            "umkm users may only submit for their own business",
        ));
    }

    let ctx = state.op_context(meta.request_id);
    let application = state.lifecycle.submit(&ctx, user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// Get an application with its full history.
#[utoipa::path(
    get,
    path = "/v1/applications/{id}",
    tag = "Applications",
    params(("id" = u64, Path, description = "Application ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Application detail", body = ApplicationDetail),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Application not found")
    )
)]
pub async fn get_application(
    AnyAdmin(_user): AnyAdmin,
    meta: RequestMeta,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ApplicationDetail>, ApiError> {
    let ctx = state.op_context(meta.request_id);
    let detail = state.lifecycle.get_with_histories(&ctx, id).await?;
    Ok(Json(detail))
}

/// Soft-delete an application. Superadmin only.
#[utoipa::path(
    delete,
    path = "/v1/applications/{id}",
    tag = "Applications",
    params(("id" = u64, Path, description = "Application ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Application deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (superadmin required)"),
        (status = 404, description = "Application not found")
    )
)]
pub async fn delete_application(
    SuperadminOnly(_user): SuperadminOnly,
    meta: RequestMeta,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let ctx = state.op_context(meta.request_id);
    state.lifecycle.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Pass screening: `screening` → `final`.
#[utoipa::path(
    post,
    path = "/v1/applications/{id}/screening/approve",
    tag = "Screening",
    params(("id" = u64, Path, description = "Application ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Application moved to final", body = TransitionResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin_screening required)"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Application is not in screening")
    )
)]
pub async fn screening_approve(
    ScreeningAdmin(user): ScreeningAdmin,
    meta: RequestMeta,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let ctx = state.op_context(meta.request_id);
    let application = state
        .lifecycle
        .screening_approve(&ctx, user.user_id, id)
        .await?;
    Ok(Json(TransitionResponse::from(&application)))
}

/// Reject at screening: `screening` → `rejected`.
#[utoipa::path(
    post,
    path = "/v1/applications/{id}/screening/reject",
    tag = "Screening",
    params(("id" = u64, Path, description = "Application ID")),
    request_body = DecisionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Application rejected", body = TransitionResponse),
        (status = 400, description = "Notes are required"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin_screening required)"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Application is not in screening")
    )
)]
pub async fn screening_reject(
    ScreeningAdmin(user): ScreeningAdmin,
    meta: RequestMeta,
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let ctx = state.op_context(meta.request_id);
    let application = state
        .lifecycle
        .screening_reject(&ctx, user.user_id, decision(id, request))
        .await?;
    Ok(Json(TransitionResponse::from(&application)))
}

/// Send back for revision: `screening` → `revised`.
#[utoipa::path(
    post,
    path = "/v1/applications/{id}/screening/revise",
    tag = "Screening",
    params(("id" = u64, Path, description = "Application ID")),
    request_body = DecisionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Application sent back for revision", body = TransitionResponse),
        (status = 400, description = "Notes are required"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin_screening required)"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Application is not in screening")
    )
)]
pub async fn screening_revise(
    ScreeningAdmin(user): ScreeningAdmin,
    meta: RequestMeta,
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let ctx = state.op_context(meta.request_id);
    let application = state
        .lifecycle
        .screening_revise(&ctx, user.user_id, decision(id, request))
        .await?;
    Ok(Json(TransitionResponse::from(&application)))
}

/// Vendor approval: `final` → `approved`.
#[utoipa::path(
    post,
    path = "/v1/applications/{id}/final/approve",
    tag = "Final",
    params(("id" = u64, Path, description = "Application ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Application approved", body = TransitionResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin_vendor required)"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Application is not in final")
    )
)]
pub async fn final_approve(
    VendorAdmin(user): VendorAdmin,
    meta: RequestMeta,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let ctx = state.op_context(meta.request_id);
    let application = state.lifecycle.final_approve(&ctx, user.user_id, id).await?;
    Ok(Json(TransitionResponse::from(&application)))
}

/// Vendor rejection: `final` → `rejected`.
#[utoipa::path(
    post,
    path = "/v1/applications/{id}/final/reject",
    tag = "Final",
    params(("id" = u64, Path, description = "Application ID")),
    request_body = DecisionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Application rejected", body = TransitionResponse),
        (status = 400, description = "Notes are required"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin_vendor required)"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Application is not in final")
    )
)]
pub async fn final_reject(
    VendorAdmin(user): VendorAdmin,
    meta: RequestMeta,
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let ctx = state.op_context(meta.request_id);
    let application = state
        .lifecycle
        .final_reject(&ctx, user.user_id, decision(id, request))
        .await?;
    Ok(Json(TransitionResponse::from(&application)))
}

fn decision(application_id: u64, request: DecisionRequest) -> Decision {
    Decision {
        application_id,
        notes: request.notes,
    }
}
