// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encrypted PII field endpoints.
//!
//! Every decrypt attempt, successful or not, lands in the decrypt audit log
//! before the response is sent.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::meta::RequestMeta;
use crate::{
    auth::{AnyAdmin, Auth},
    error::ApiError,
    pii::{DecryptParams, SensitiveField},
    state::AppState,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EncryptRequest {
    pub field: SensitiveField,
    pub plaintext: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EncryptResponse {
    pub field: SensitiveField,
    /// Transit ciphertext (`vault:v<N>:...`).
    pub ciphertext: String,
}

/// A decrypt call and the record it claims to come from.
///
/// `umkm_id`, `table_name` and `record_id` are asserted by the caller and
/// copied into the audit log as given. They are not checked against the
/// stored record that holds the ciphertext.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DecryptRequest {
    pub field: SensitiveField,
    pub ciphertext: String,
    /// UMKM that owns the record, when known.
    #[serde(default)]
    pub umkm_id: Option<u64>,
    /// Table the ciphertext was read from.
    pub table_name: String,
    pub record_id: u64,
    /// Why the plaintext is needed. Recorded in the audit log.
    pub purpose: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DecryptResponse {
    pub field: SensitiveField,
    pub plaintext: String,
}

/// Encrypt a PII value with the field's transit key.
#[utoipa::path(
    post,
    path = "/v1/pii/encrypt",
    tag = "PII",
    request_body = EncryptRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Value encrypted", body = EncryptResponse),
        (status = 400, description = "Empty plaintext"),
        (status = 401, description = "Not authenticated"),
        (status = 502, description = "Transit encryption failed"),
        (status = 503, description = "Transit not configured")
    )
)]
pub async fn encrypt_field(
    Auth(_user): Auth,
    meta: RequestMeta,
    State(state): State<AppState>,
    Json(request): Json<EncryptRequest>,
) -> Result<Json<EncryptResponse>, ApiError> {
    if request.plaintext.is_empty() {
        return Err(ApiError::bad_request("plaintext must not be empty"));
    }

    let ctx = state.op_context(meta.request_id);
    let ciphertext = state
        .gateway
        .encrypt(&ctx, request.field, &request.plaintext)
        .await?;

    Ok(Json(EncryptResponse {
        field: request.field,
        ciphertext,
    }))
}

/// Decrypt a PII value. Admin only; every attempt is audited.
#[utoipa::path(
    post,
    path = "/v1/pii/decrypt",
    tag = "PII",
    request_body = DecryptRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Value decrypted", body = DecryptResponse),
        (status = 400, description = "Missing purpose or table name"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 502, description = "Transit decryption failed"),
        (status = 503, description = "Transit not configured")
    )
)]
pub async fn decrypt_field(
    AnyAdmin(user): AnyAdmin,
    meta: RequestMeta,
    State(state): State<AppState>,
    Json(request): Json<DecryptRequest>,
) -> Result<Json<DecryptResponse>, ApiError> {
    let purpose = request.purpose.trim();
    if purpose.is_empty() {
        return Err(ApiError::bad_request("purpose is required"));
    }
    let table_name = request.table_name.trim();
    if table_name.is_empty() {
        return Err(ApiError::bad_request("table_name is required"));
    }

    let ctx = state.op_context(meta.request_id);
    let params = DecryptParams {
        user_id: user.user_id,
        umkm_id: request.umkm_id,
        field: request.field,
        table_name: table_name.to_string(),
        record_id: request.record_id,
        purpose: purpose.to_string(),
        ip_address: meta.ip_address,
        user_agent: meta.user_agent,
    };

    let plaintext = state
        .gateway
        .decrypt(&ctx, &request.ciphertext, &params)
        .await?;

    Ok(Json(DecryptResponse {
        field: request.field,
        plaintext,
    }))
}
