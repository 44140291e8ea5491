// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for the lifecycle engine and the encrypted-field gateway,
//! plus the HTTP error body used by the API layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::context::Interrupted;
use crate::models::ApplicationStatus;
use crate::storage::StorageError;

/// Failures surfaced by the core subsystems.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Referenced entity does not exist (or is soft-deleted).
    #[error("not found: {0}")]
    NotFound(String),

    /// Requested transition does not start from the persisted status.
    #[error("application {id} is {current}, expected {expected}")]
    InvalidState {
        id: u64,
        current: ApplicationStatus,
        expected: ApplicationStatus,
    },

    /// Required input missing or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Transit decrypt failed or returned unusable data.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Transit encrypt failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// No transit client was wired in at startup.
    #[error("transit encryption is not configured")]
    NotConfigured,

    /// Repository read or write failed.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Caller cancelled or the deadline passed.
    #[error("operation interrupted: {0}")]
    Interrupted(#[from] Interrupted),
}

impl CoreError {
    /// Stable machine-readable code.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "not_found",
            CoreError::InvalidState { .. } => "invalid_state",
            CoreError::Validation(_) => "validation_error",
            CoreError::DecryptionFailed(_) => "decryption_failed",
            CoreError::EncryptionFailed(_) => "encryption_failed",
            CoreError::NotConfigured => "not_configured",
            CoreError::Persistence(_) => "persistence_error",
            CoreError::Interrupted(_) => "interrupted",
        }
    }

    /// Whether the caller is at fault (4xx) rather than the server (5xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CoreError::NotFound(_) | CoreError::InvalidState { .. } | CoreError::Validation(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::InvalidState { .. } => StatusCode::CONFLICT,
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::DecryptionFailed(_) | CoreError::EncryptionFailed(_) => {
                StatusCode::BAD_GATEWAY
            }
            CoreError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CoreError::Interrupted(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => CoreError::NotFound(what),
            StorageError::StatusMismatch {
                id,
                current,
                expected,
            } => CoreError::InvalidState {
                id,
                current,
                expected,
            },
            other => CoreError::Persistence(other.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "insufficient_permissions", message)
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        // Server-side details stay in the logs.
        let message = if e.is_client_error() {
            e.to_string()
        } else {
            tracing::error!(error = %e, code = e.error_code(), "Request failed");
            match e {
                CoreError::NotConfigured => e.to_string(),
                CoreError::Interrupted(reason) => reason.to_string(),
                _ => "internal server error".to_string(),
            }
        };
        Self::new(e.status_code(), e.error_code(), message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.code.to_string(),
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn client_errors_map_to_4xx() {
        let nf = CoreError::NotFound("Application 9".into());
        assert!(nf.is_client_error());
        assert_eq!(nf.status_code(), StatusCode::NOT_FOUND);

        let invalid = CoreError::InvalidState {
            id: 1,
            current: ApplicationStatus::Final,
            expected: ApplicationStatus::Screening,
        };
        assert!(invalid.is_client_error());
        assert_eq!(invalid.to_string(), "application 1 is final, expected screening");

        let validation = CoreError::Validation("notes are required".into());
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn server_errors_map_to_5xx() {
        for e in [
            CoreError::DecryptionFailed("boom".into()),
            CoreError::NotConfigured,
            CoreError::Persistence("disk".into()),
            CoreError::Interrupted(Interrupted::DeadlineExceeded),
        ] {
            assert!(!e.is_client_error());
            assert!(e.status_code().is_server_error());
        }
    }

    #[test]
    fn status_mismatch_becomes_invalid_state() {
        let err: CoreError = StorageError::StatusMismatch {
            id: 4,
            current: ApplicationStatus::Rejected,
            expected: ApplicationStatus::Screening,
        }
        .into();
        assert!(matches!(
            err,
            CoreError::InvalidState {
                id: 4,
                current: ApplicationStatus::Rejected,
                expected: ApplicationStatus::Screening
            }
        ));
    }

    #[tokio::test]
    async fn server_error_body_hides_details() {
        let api: ApiError = CoreError::Persistence("redb commit failed at page 7".into()).into();
        let response = api.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], "internal server error");
        assert_eq!(body["error_code"], "persistence_error");
    }

    #[tokio::test]
    async fn client_error_body_is_verbatim() {
        let api: ApiError = CoreError::Validation("notes are required".into()).into();
        let response = api.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], "validation failed: notes are required");
    }
}
