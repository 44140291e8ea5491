// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encrypted-field gateway.
//!
//! `decrypt` always writes exactly one [`VaultDecryptLog`] record, whatever
//! the outcome, and returns plaintext only after that record is stored.

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{DecryptParams, SensitiveField, TransitKeys};
use crate::context::OpContext;
use crate::error::CoreError;
use crate::providers::TransitEncryption;
use crate::storage::{DecryptAuditSink, VaultDecryptLog};

pub struct EncryptedFieldGateway<T, A> {
    transit: Option<T>,
    audit: A,
    keys: TransitKeys,
}

impl<T, A> EncryptedFieldGateway<T, A>
where
    T: TransitEncryption,
    A: DecryptAuditSink,
{
    pub fn new(transit: T, audit: A, keys: TransitKeys) -> Self {
        Self {
            transit: Some(transit),
            audit,
            keys,
        }
    }

    /// Gateway without a transit backend. Every call fails with
    /// `NotConfigured`; decrypt attempts are still audited.
    pub fn unconfigured(audit: A, keys: TransitKeys) -> Self {
        Self {
            transit: None,
            audit,
            keys,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.transit.is_some()
    }

    /// Resolve a ciphertext field to plaintext, auditing the attempt.
    pub async fn decrypt(
        &self,
        ctx: &OpContext,
        ciphertext: &str,
        params: &DecryptParams,
    ) -> Result<String, CoreError> {
        let outcome = self.resolve(ctx, ciphertext, params.field).await;

        let log = VaultDecryptLog {
            id: Uuid::new_v4().to_string(),
            user_id: params.user_id,
            umkm_id: params.umkm_id,
            field_name: params.field.as_str().to_string(),
            table_name: params.table_name.clone(),
            record_id: params.record_id,
            purpose: params.purpose.clone(),
            ip_address: params.ip_address.clone(),
            user_agent: params.user_agent.clone(),
            request_id: ctx.request_id().map(str::to_string),
            success: outcome.is_ok(),
            error_message: outcome.as_ref().err().map(|e| e.to_string()),
            decrypted_at: Utc::now(),
        };

        // Not bounded by ctx: the attempt is recorded even if the caller gave up.
        if let Err(e) = self.audit.create(&log).await {
            error!(
                audit_id = %log.id,
                user_id = params.user_id,
                field = %params.field,
                error = %e,
                "Failed to write decrypt audit log"
            );
            return Err(CoreError::Persistence(format!(
                "decrypt audit write failed: {e}"
            )));
        }

        match &outcome {
            Ok(_) => info!(
                audit_id = %log.id,
                user_id = params.user_id,
                field = %params.field,
                table = %params.table_name,
                record_id = params.record_id,
                purpose = %params.purpose,
                "PII decrypted"
            ),
            Err(e) => warn!(
                audit_id = %log.id,
                user_id = params.user_id,
                field = %params.field,
                table = %params.table_name,
                record_id = params.record_id,
                error = %e,
                "PII decrypt failed"
            ),
        }

        outcome
    }

    /// Encrypt a plaintext field value for storage. Not audited.
    pub async fn encrypt(
        &self,
        ctx: &OpContext,
        field: SensitiveField,
        plaintext: &str,
    ) -> Result<String, CoreError> {
        let transit = self.transit.as_ref().ok_or(CoreError::NotConfigured)?;
        ctx.check()?;

        let key = self.keys.key_for(field);
        debug!(field = %field, key = key, "Encrypting PII field");

        ctx.run(transit.encrypt(self.keys.mount_path(), key, plaintext.as_bytes()))
            .await?
            .map_err(|e| CoreError::EncryptionFailed(e.to_string()))
    }

    async fn resolve(
        &self,
        ctx: &OpContext,
        ciphertext: &str,
        field: SensitiveField,
    ) -> Result<String, CoreError> {
        let transit = self.transit.as_ref().ok_or(CoreError::NotConfigured)?;
        ctx.check()?;

        if ciphertext.trim().is_empty() {
            return Err(CoreError::DecryptionFailed("empty ciphertext".to_string()));
        }

        let plaintext = ctx
            .run(transit.decrypt(self.keys.mount_path(), self.keys.key_for(field), ciphertext))
            .await?
            .map_err(|e| CoreError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| CoreError::DecryptionFailed("plaintext is not valid UTF-8".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Interrupted;
    use crate::providers::{TransitError, VaultTransitClient};
    use crate::storage::{DecryptAuditRepository, FileStorage, StorageError, StoragePaths};
    use base64ct::{Base64, Encoding};
    use secrecy::SecretString;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingSink {
        logs: Mutex<Vec<VaultDecryptLog>>,
    }

    impl RecordingSink {
        fn logs(&self) -> Vec<VaultDecryptLog> {
            self.logs.lock().unwrap().clone()
        }
    }

    impl DecryptAuditSink for RecordingSink {
        async fn create(&self, log: &VaultDecryptLog) -> crate::storage::StorageResult<()> {
            self.logs.lock().unwrap().push(log.clone());
            Ok(())
        }
    }

    struct FailingSink;

    impl DecryptAuditSink for FailingSink {
        async fn create(&self, _log: &VaultDecryptLog) -> crate::storage::StorageResult<()> {
            Err(StorageError::Io(std::io::Error::other("disk full")))
        }
    }

    /// Returns a fixed plaintext and records which key was used.
    struct FixedTransit {
        plaintext: Vec<u8>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl FixedTransit {
        fn new(plaintext: &[u8]) -> Self {
            Self {
                plaintext: plaintext.to_vec(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl TransitEncryption for FixedTransit {
        async fn encrypt(&self, mount: &str, key: &str, _: &[u8]) -> Result<String, TransitError> {
            self.calls
                .lock()
                .unwrap()
                .push((mount.to_string(), key.to_string()));
            Ok("vault:v1:fixed".to_string())
        }

        async fn decrypt(&self, mount: &str, key: &str, _: &str) -> Result<Vec<u8>, TransitError> {
            self.calls
                .lock()
                .unwrap()
                .push((mount.to_string(), key.to_string()));
            Ok(self.plaintext.clone())
        }
    }

    /// Never answers.
    struct HangingTransit;

    impl TransitEncryption for HangingTransit {
        async fn encrypt(&self, _: &str, _: &str, _: &[u8]) -> Result<String, TransitError> {
            std::future::pending().await
        }

        async fn decrypt(&self, _: &str, _: &str, _: &str) -> Result<Vec<u8>, TransitError> {
            std::future::pending().await
        }
    }

    fn params(field: SensitiveField) -> DecryptParams {
        DecryptParams {
            user_id: 7,
            umkm_id: Some(31),
            field,
            table_name: "umkms".to_string(),
            record_id: 31,
            purpose: "profile_view".to_string(),
            ip_address: Some("10.1.2.3".to_string()),
            user_agent: Some("admin-ui/1.0".to_string()),
        }
    }

    fn vault_client(uri: &str) -> VaultTransitClient {
        VaultTransitClient::new(uri, SecretString::from("test-token"), Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn decrypt_success_is_audited() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/v1/transit/decrypt/umkm-nik"))
            .and(matchers::body_json(json!({ "ciphertext": "vault:v1:test_nik_cipher" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "plaintext": Base64::encode_string(b"1234567890123456") }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let sink = Arc::new(RecordingSink::default());
        let gateway = EncryptedFieldGateway::new(
            vault_client(&mock_server.uri()),
            sink.clone(),
            TransitKeys::default(),
        );
        let ctx = OpContext::background().with_request_id("req-42");

        let plaintext = gateway
            .decrypt(&ctx, "vault:v1:test_nik_cipher", &params(SensitiveField::Nik))
            .await
            .unwrap();
        assert_eq!(plaintext, "1234567890123456");

        let logs = sink.logs();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].success);
        assert_eq!(logs[0].field_name, "nik");
        assert_eq!(logs[0].user_id, 7);
        assert_eq!(logs[0].request_id.as_deref(), Some("req-42"));
        assert!(logs[0].error_message.is_none());
    }

    #[tokio::test]
    async fn transit_http_error_is_audited_as_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let sink = Arc::new(RecordingSink::default());
        let gateway = EncryptedFieldGateway::new(
            vault_client(&mock_server.uri()),
            sink.clone(),
            TransitKeys::default(),
        );

        let result = gateway
            .decrypt(
                &OpContext::background(),
                "vault:v1:test_nik_cipher",
                &params(SensitiveField::Nik),
            )
            .await;
        assert!(matches!(result, Err(CoreError::DecryptionFailed(_))));

        let logs = sink.logs();
        assert_eq!(logs.len(), 1);
        assert!(!logs[0].success);
        let message = logs[0].error_message.as_deref().unwrap();
        assert!(message.contains("500"));
    }

    #[tokio::test]
    async fn unconfigured_gateway_still_audits() {
        let sink = Arc::new(RecordingSink::default());
        let gateway: EncryptedFieldGateway<FixedTransit, _> =
            EncryptedFieldGateway::unconfigured(sink.clone(), TransitKeys::default());

        let result = gateway
            .decrypt(&OpContext::background(), "vault:v1:x", &params(SensitiveField::Nik))
            .await;
        assert!(matches!(result, Err(CoreError::NotConfigured)));

        let logs = sink.logs();
        assert_eq!(logs.len(), 1);
        assert!(!logs[0].success);
        assert_eq!(
            logs[0].error_message.as_deref(),
            Some("transit encryption is not configured")
        );

        let encrypt = gateway
            .encrypt(&OpContext::background(), SensitiveField::Nik, "123")
            .await;
        assert!(matches!(encrypt, Err(CoreError::NotConfigured)));
        assert_eq!(sink.logs().len(), 1);
    }

    #[tokio::test]
    async fn kartu_number_uses_kartu_key() {
        let transit = FixedTransit::new(b"4111111111111111");
        let sink = Arc::new(RecordingSink::default());
        let gateway = EncryptedFieldGateway::new(transit, sink.clone(), TransitKeys::default());

        let plaintext = gateway
            .decrypt(
                &OpContext::background(),
                "vault:v1:card",
                &params(SensitiveField::KartuNumber),
            )
            .await
            .unwrap();
        assert_eq!(plaintext, "4111111111111111");

        let calls = gateway.transit.as_ref().unwrap().calls.lock().unwrap().clone();
        assert_eq!(calls, vec![("transit".to_string(), "umkm-kartu".to_string())]);
        assert_eq!(sink.logs()[0].field_name, "kartu_number");
    }

    #[tokio::test]
    async fn empty_ciphertext_fails_without_transit_call() {
        let sink = Arc::new(RecordingSink::default());
        let gateway =
            EncryptedFieldGateway::new(FixedTransit::new(b"x"), sink.clone(), TransitKeys::default());

        let result = gateway
            .decrypt(&OpContext::background(), "  ", &params(SensitiveField::Nik))
            .await;
        assert!(matches!(result, Err(CoreError::DecryptionFailed(_))));
        assert!(gateway.transit.as_ref().unwrap().calls.lock().unwrap().is_empty());

        let logs = sink.logs();
        assert_eq!(logs.len(), 1);
        assert!(!logs[0].success);
    }

    #[tokio::test]
    async fn non_utf8_plaintext_is_decryption_failure() {
        let sink = Arc::new(RecordingSink::default());
        let gateway = EncryptedFieldGateway::new(
            FixedTransit::new(&[0xff, 0xfe, 0x00]),
            sink.clone(),
            TransitKeys::default(),
        );

        let result = gateway
            .decrypt(&OpContext::background(), "vault:v1:x", &params(SensitiveField::Nik))
            .await;
        assert!(matches!(result, Err(CoreError::DecryptionFailed(_))));
        assert!(!sink.logs()[0].success);
    }

    #[tokio::test]
    async fn audit_failure_withholds_plaintext() {
        let gateway = EncryptedFieldGateway::new(
            FixedTransit::new(b"1234567890123456"),
            FailingSink,
            TransitKeys::default(),
        );

        let result = gateway
            .decrypt(&OpContext::background(), "vault:v1:x", &params(SensitiveField::Nik))
            .await;
        assert!(matches!(result, Err(CoreError::Persistence(_))));
    }

    #[tokio::test]
    async fn cancelled_request_is_audited() {
        let sink = Arc::new(RecordingSink::default());
        let gateway = EncryptedFieldGateway::new(HangingTransit, sink.clone(), TransitKeys::default());

        let token = CancellationToken::new();
        let ctx = OpContext::background().with_cancellation(token.clone());
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let result = gateway
            .decrypt(&ctx, "vault:v1:x", &params(SensitiveField::Nik))
            .await;
        canceller.await.unwrap();

        assert!(matches!(
            result,
            Err(CoreError::Interrupted(Interrupted::Cancelled))
        ));
        let logs = sink.logs();
        assert_eq!(logs.len(), 1);
        assert!(!logs[0].success);
        assert!(logs[0].error_message.as_deref().unwrap().contains("cancelled"));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_exceeded_is_audited() {
        let sink = Arc::new(RecordingSink::default());
        let gateway = EncryptedFieldGateway::new(HangingTransit, sink.clone(), TransitKeys::default());
        let ctx = OpContext::background().with_timeout(Duration::from_secs(10));

        let result = gateway
            .decrypt(&ctx, "vault:v1:x", &params(SensitiveField::Nik))
            .await;

        assert!(matches!(
            result,
            Err(CoreError::Interrupted(Interrupted::DeadlineExceeded))
        ));
        assert_eq!(sink.logs().len(), 1);
    }

    #[tokio::test]
    async fn decrypt_log_lands_on_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut storage = FileStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        let repo = Arc::new(DecryptAuditRepository::new(storage));

        let gateway = EncryptedFieldGateway::new(
            FixedTransit::new(b"3201011502900001"),
            repo.clone(),
            TransitKeys::default(),
        );
        gateway
            .decrypt(&OpContext::background(), "vault:v1:x", &params(SensitiveField::Nik))
            .await
            .unwrap();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let logs = repo.read_logs(&today).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!((logs[0].table_name.as_str(), logs[0].record_id), ("umkms", 31));
        assert_eq!(logs[0].purpose, "profile_view");
    }

    #[tokio::test]
    async fn encrypt_uses_field_key_and_skips_audit() {
        let sink = Arc::new(RecordingSink::default());
        let gateway =
            EncryptedFieldGateway::new(FixedTransit::new(b""), sink.clone(), TransitKeys::default());

        let ciphertext = gateway
            .encrypt(&OpContext::background(), SensitiveField::Nik, "3201011502900001")
            .await
            .unwrap();
        assert_eq!(ciphertext, "vault:v1:fixed");
        assert!(sink.logs().is_empty());

        let calls = gateway.transit.as_ref().unwrap().calls.lock().unwrap().clone();
        assert_eq!(calls, vec![("transit".to_string(), "umkm-nik".to_string())]);
    }
}
