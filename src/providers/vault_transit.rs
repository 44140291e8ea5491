// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HashiCorp Vault transit secrets engine client.
//!
//! ```text
//! POST {addr}/v1/{mount}/encrypt/{key}   {"plaintext": "<base64>"}
//!   -> {"data": {"ciphertext": "vault:v1:..."}}
//! POST {addr}/v1/{mount}/decrypt/{key}   {"ciphertext": "vault:v1:..."}
//!   -> {"data": {"plaintext": "<base64>"}}
//! ```

use std::time::Duration;

use base64ct::{Base64, Encoding};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use super::{TransitEncryption, TransitError};

const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";

#[derive(Debug, Deserialize)]
struct VaultEnvelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct EncryptData {
    ciphertext: String,
}

#[derive(Debug, Deserialize)]
struct DecryptData {
    plaintext: String,
}

#[derive(Debug, Clone)]
pub struct VaultTransitClient {
    base_url: String,
    token: SecretString,
    http: Client,
}

impl VaultTransitClient {
    /// Build a client for the Vault server at `addr`.
    ///
    /// `timeout` bounds each HTTP request end to end.
    pub fn new(addr: &str, token: SecretString, timeout: Duration) -> Result<Self, TransitError> {
        let parsed = Url::parse(addr)
            .map_err(|e| TransitError::InvalidConfig(format!("invalid VAULT_ADDR {addr}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TransitError::InvalidConfig(format!(
                "VAULT_ADDR must be http or https, got {}",
                parsed.scheme()
            )));
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransitError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            token,
            http,
        })
    }

    fn endpoint(&self, mount: &str, operation: &str, key: &str) -> Result<String, TransitError> {
        let mount = mount.trim_matches('/');
        if mount.is_empty() || key.is_empty() || key.contains('/') {
            return Err(TransitError::InvalidConfig(format!(
                "invalid transit mount/key: {mount:?}/{key:?}"
            )));
        }
        Ok(format!("{}/v1/{mount}/{operation}/{key}", self.base_url))
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        payload: &Value,
    ) -> Result<T, TransitError> {
        let response = self
            .http
            .post(url)
            .header(VAULT_TOKEN_HEADER, self.token.expose_secret())
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransitError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: VaultEnvelope<T> = response
            .json()
            .await
            .map_err(|e| TransitError::InvalidResponse(format!("invalid JSON: {e}")))?;

        envelope
            .data
            .ok_or_else(|| TransitError::InvalidResponse("missing data field".to_string()))
    }
}

impl TransitEncryption for VaultTransitClient {
    async fn encrypt(
        &self,
        mount: &str,
        key: &str,
        plaintext: &[u8],
    ) -> Result<String, TransitError> {
        let url = self.endpoint(mount, "encrypt", key)?;
        let payload = json!({ "plaintext": Base64::encode_string(plaintext) });

        let data: EncryptData = self.post_json(&url, &payload).await?;
        if data.ciphertext.is_empty() {
            return Err(TransitError::InvalidResponse(
                "empty ciphertext in response".to_string(),
            ));
        }
        Ok(data.ciphertext)
    }

    async fn decrypt(
        &self,
        mount: &str,
        key: &str,
        ciphertext: &str,
    ) -> Result<Vec<u8>, TransitError> {
        let url = self.endpoint(mount, "decrypt", key)?;
        let payload = json!({ "ciphertext": ciphertext });

        let data: DecryptData = self.post_json(&url, &payload).await?;
        Base64::decode_vec(&data.plaintext)
            .map_err(|e| TransitError::InvalidResponse(format!("plaintext is not base64: {e}")))
    }
}
