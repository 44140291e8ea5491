// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared application state: the collaborators built once at startup and
//! handed to every request.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::context::OpContext;
use crate::lifecycle::LifecycleEngine;
use crate::pii::{EncryptedFieldGateway, TransitKeys};
use crate::providers::{TransitError, VaultTransitClient};
use crate::storage::{
    ApplicationDatabase, DecryptAuditRepository, FileStorage, StorageError, StoragePaths,
};

pub type Engine = LifecycleEngine<ApplicationDatabase>;
pub type Gateway = EncryptedFieldGateway<VaultTransitClient, Arc<DecryptAuditRepository>>;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JWT verification settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret: SecretString,
    pub issuer: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("storage initialization failed: {0}")]
    Storage(#[from] StorageError),

    #[error("transit client initialization failed: {0}")]
    Transit(#[from] TransitError),
}

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<Engine>,
    pub gateway: Arc<Gateway>,
    pub decrypt_logs: Arc<DecryptAuditRepository>,
    pub storage: FileStorage,
    pub auth_config: AuthConfig,
    pub request_timeout: Duration,
    /// Cancelled on server shutdown; every request context derives from it.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Open storage under `storage`'s root and wire the collaborators.
    ///
    /// `transit` of `None` leaves PII endpoints answering `NotConfigured`.
    pub fn new(
        mut storage: FileStorage,
        transit: Option<VaultTransitClient>,
        keys: TransitKeys,
        auth_config: AuthConfig,
    ) -> Result<Self, BootstrapError> {
        storage.initialize()?;

        let database = ApplicationDatabase::open(&storage.paths().applications_db())?;
        let decrypt_logs = Arc::new(DecryptAuditRepository::new(storage.clone()));
        let gateway = match transit {
            Some(client) => EncryptedFieldGateway::new(client, decrypt_logs.clone(), keys),
            None => EncryptedFieldGateway::unconfigured(decrypt_logs.clone(), keys),
        };

        Ok(Self {
            lifecycle: Arc::new(LifecycleEngine::new(database)),
            gateway: Arc::new(gateway),
            decrypt_logs,
            storage,
            auth_config,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, BootstrapError> {
        let transit = config
            .vault
            .as_ref()
            .map(|vault| {
                VaultTransitClient::new(&vault.addr, vault.token.clone(), config.vault_timeout)
            })
            .transpose()?;

        let state = Self::new(
            FileStorage::new(StoragePaths::new(&config.data_dir)),
            transit,
            config.transit_keys.clone(),
            AuthConfig {
                secret: config.jwt_secret.clone(),
                issuer: config.jwt_issuer.clone(),
            },
        )?;
        Ok(state.with_request_timeout(config.request_timeout))
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Cancel every outstanding request context once `grace` has passed.
    ///
    /// Requests already in flight when shutdown starts get the full grace
    /// window to finish before their contexts are cancelled.
    pub async fn cancel_after(&self, grace: Duration) {
        tokio::time::sleep(grace).await;
        self.shutdown.cancel();
    }

    /// Context for one request: bounded by the request timeout and
    /// cancelled on shutdown.
    pub fn op_context(&self, request_id: Option<String>) -> OpContext {
        let ctx = OpContext::background()
            .with_cancellation(self.shutdown.child_token())
            .with_timeout(self.request_timeout);
        match request_id {
            Some(id) => ctx.with_request_id(id),
            None => ctx,
        }
    }
}

/// State rooted in a fresh temp dir, with the given transit client.
#[cfg(test)]
pub(crate) fn test_state_with(transit: Option<VaultTransitClient>) -> (AppState, tempfile::TempDir) {
    let temp = tempfile::TempDir::new().expect("Failed to create temp dir");
    let state = AppState::new(
        FileStorage::new(StoragePaths::new(temp.path())),
        transit,
        TransitKeys::default(),
        AuthConfig {
            secret: SecretString::from("test-secret"),
            issuer: None,
        },
    )
    .expect("Failed to build test state");
    (state, temp)
}

#[cfg(test)]
pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
    test_state_with(None)
}
