// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        Application, ApplicationDetail, ApplicationHistory, ApplicationStatus, ApplicationType,
        DecisionRequest, HistoryAction, NewApplication, TransitionResponse,
    },
    pii::SensitiveField,
    state::AppState,
    storage::VaultDecryptLog,
};

pub mod admin;
pub mod applications;
pub mod health;
pub mod meta;
pub mod pii;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/applications", post(applications::submit_application))
        .route(
            "/applications/{id}",
            get(applications::get_application).delete(applications::delete_application),
        )
        .route(
            "/applications/{id}/screening/approve",
            post(applications::screening_approve),
        )
        .route(
            "/applications/{id}/screening/reject",
            post(applications::screening_reject),
        )
        .route(
            "/applications/{id}/screening/revise",
            post(applications::screening_revise),
        )
        .route(
            "/applications/{id}/final/approve",
            post(applications::final_approve),
        )
        .route(
            "/applications/{id}/final/reject",
            post(applications::final_reject),
        )
        .route("/pii/encrypt", post(pii::encrypt_field))
        .route("/pii/decrypt", post(pii::decrypt_field))
        .route("/admin/decrypt-logs", get(admin::query_decrypt_logs));

    Router::new()
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(CorsLayer::permissive())
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::liveness,
        health::readiness,
        applications::submit_application,
        applications::get_application,
        applications::delete_application,
        applications::screening_approve,
        applications::screening_reject,
        applications::screening_revise,
        applications::final_approve,
        applications::final_reject,
        pii::encrypt_field,
        pii::decrypt_field,
        admin::query_decrypt_logs
    ),
    components(
        schemas(
            Application,
            ApplicationDetail,
            ApplicationHistory,
            ApplicationStatus,
            ApplicationType,
            HistoryAction,
            NewApplication,
            DecisionRequest,
            TransitionResponse,
            SensitiveField,
            VaultDecryptLog,
            pii::EncryptRequest,
            pii::EncryptResponse,
            pii::DecryptRequest,
            pii::DecryptResponse,
            admin::DecryptLogResponse,
            health::HealthResponse,
            health::ReadyResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Liveness and readiness checks"),
        (name = "Applications", description = "Application submission and lookup"),
        (name = "Screening", description = "First-stage review by admin_screening"),
        (name = "Final", description = "Second-stage review by admin_vendor"),
        (name = "PII", description = "Transit encryption of sensitive fields"),
        (name = "Admin", description = "Decrypt audit review")
    )
)]
struct ApiDoc;
