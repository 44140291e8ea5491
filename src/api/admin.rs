// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Superadmin review of the decrypt audit log.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::SuperadminOnly,
    error::{ApiError, CoreError},
    state::AppState,
    storage::VaultDecryptLog,
};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;
/// Widest date window a single query may scan.
const MAX_RANGE_DAYS: i64 = 31;

/// Query parameters for decrypt log queries.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DecryptLogQuery {
    /// Start date (YYYY-MM-DD format). Defaults to today.
    pub start_date: Option<String>,
    /// End date (YYYY-MM-DD format). Defaults to `start_date`.
    pub end_date: Option<String>,
    /// Filter by the admin who decrypted.
    pub user_id: Option<u64>,
    pub umkm_id: Option<u64>,
    pub table_name: Option<String>,
    pub record_id: Option<u64>,
    /// Only successful (`true`) or failed (`false`) attempts.
    pub success: Option<bool>,
    /// Maximum number of results (default 100, max 1000).
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DecryptLogResponse {
    pub logs: Vec<VaultDecryptLog>,
    /// Matches before limit/offset.
    pub total: usize,
    pub has_more: bool,
}

/// Query decrypt audit records.
///
/// Filters by date range, admin, UMKM, record and outcome. Superadmin only.
#[utoipa::path(
    get,
    path = "/v1/admin/decrypt-logs",
    tag = "Admin",
    params(DecryptLogQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Decrypt audit records", body = DecryptLogResponse),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (superadmin required)")
    )
)]
pub async fn query_decrypt_logs(
    SuperadminOnly(admin): SuperadminOnly,
    Query(params): Query<DecryptLogQuery>,
    State(state): State<AppState>,
) -> Result<Json<DecryptLogResponse>, ApiError> {
    let today = Utc::now().date_naive();
    let start = parse_date("start_date", params.start_date.as_deref())?.unwrap_or(today);
    let end = parse_date("end_date", params.end_date.as_deref())?.unwrap_or(start);

    if end < start {
        return Err(ApiError::bad_request("end_date is before start_date"));
    }
    if (end - start).num_days() >= MAX_RANGE_DAYS {
        return Err(ApiError::bad_request(format!(
            "date range must not exceed {MAX_RANGE_DAYS} days"
        )));
    }

    let mut logs = state
        .decrypt_logs
        .read_logs_range(
            &start.format("%Y-%m-%d").to_string(),
            &end.format("%Y-%m-%d").to_string(),
        )
        .map_err(CoreError::from)?;

    if let Some(user_id) = params.user_id {
        logs.retain(|l| l.user_id == user_id);
    }
    if let Some(umkm_id) = params.umkm_id {
        logs.retain(|l| l.umkm_id == Some(umkm_id));
    }
    if let Some(table_name) = &params.table_name {
        logs.retain(|l| &l.table_name == table_name);
    }
    if let Some(record_id) = params.record_id {
        logs.retain(|l| l.record_id == record_id);
    }
    if let Some(success) = params.success {
        logs.retain(|l| l.success == success);
    }

    let total = logs.len();
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let offset = params.offset.unwrap_or(0);
    let has_more = offset + limit < total;
    let logs: Vec<VaultDecryptLog> = logs.into_iter().skip(offset).take(limit).collect();

    info!(
        admin_id = admin.user_id,
        start = %start,
        end = %end,
        returned = logs.len(),
        total = total,
        "Decrypt logs queried"
    );

    Ok(Json(DecryptLogResponse {
        logs,
        total,
        has_more,
    }))
}

fn parse_date(name: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    raw.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| ApiError::bad_request(format!("Invalid {name} format. Use YYYY-MM-DD.")))
    })
    .transpose()
}
