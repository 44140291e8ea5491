// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read once from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for the database and audit logs | `/data` |
//! | `JWT_SECRET` | HS256 secret shared with the identity service | Required |
//! | `JWT_ISSUER` | Expected `iss` claim | Optional |
//! | `VAULT_ADDR` | Vault server URL | Optional (PII endpoints return 503 without it) |
//! | `VAULT_TOKEN` | Vault token with transit encrypt/decrypt policy | Required with `VAULT_ADDR` |
//! | `VAULT_TRANSIT_MOUNT` | Transit secrets engine mount | `transit` |
//! | `VAULT_NIK_KEY` | Transit key for NIK | `umkm-nik` |
//! | `VAULT_KARTU_KEY` | Transit key for card numbers | `umkm-kartu` |
//! | `VAULT_TIMEOUT_SECS` | Per-request timeout for Vault calls | `10` |
//! | `REQUEST_TIMEOUT_SECS` | Deadline for each API operation | `30` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM certificate chain and key | Optional (plain HTTP without) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::pii::{TransitKeys, DEFAULT_KARTU_KEY, DEFAULT_NIK_KEY, DEFAULT_TRANSIT_MOUNT};
use crate::storage::paths::DATA_ROOT;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";
pub const VAULT_ADDR_ENV: &str = "VAULT_ADDR";
pub const VAULT_TOKEN_ENV: &str = "VAULT_TOKEN";
pub const VAULT_TRANSIT_MOUNT_ENV: &str = "VAULT_TRANSIT_MOUNT";
pub const VAULT_NIK_KEY_ENV: &str = "VAULT_NIK_KEY";
pub const VAULT_KARTU_KEY_ENV: &str = "VAULT_KARTU_KEY";
pub const VAULT_TIMEOUT_SECS_ENV: &str = "VAULT_TIMEOUT_SECS";
pub const REQUEST_TIMEOUT_SECS_ENV: &str = "REQUEST_TIMEOUT_SECS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_VAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub addr: String,
    pub token: SecretString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: SecretString,
    pub jwt_issuer: Option<String>,
    /// `None` leaves the PII gateway unconfigured.
    pub vault: Option<VaultConfig>,
    pub transit_keys: TransitKeys,
    pub vault_timeout: Duration,
    pub request_timeout: Duration,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let or_default = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let port = match get(PORT_ENV) {
            Some(raw) => parse_number(PORT_ENV, &raw)?,
            None => DEFAULT_PORT,
        };

        let jwt_secret = get(JWT_SECRET_ENV)
            .map(SecretString::from)
            .ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;

        let vault = match (get(VAULT_ADDR_ENV), get(VAULT_TOKEN_ENV)) {
            (Some(addr), Some(token)) => Some(VaultConfig {
                addr,
                token: SecretString::from(token),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(VAULT_TOKEN_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(VAULT_ADDR_ENV)),
        };

        let mount = transit_mount(or_default(VAULT_TRANSIT_MOUNT_ENV, DEFAULT_TRANSIT_MOUNT))?;
        let nik_key = transit_key(VAULT_NIK_KEY_ENV, or_default(VAULT_NIK_KEY_ENV, DEFAULT_NIK_KEY))?;
        let kartu_key = transit_key(
            VAULT_KARTU_KEY_ENV,
            or_default(VAULT_KARTU_KEY_ENV, DEFAULT_KARTU_KEY),
        )?;
        // Per-variable checks above leave only the shared-key case.
        let transit_keys =
            TransitKeys::new(mount, nik_key, kartu_key).map_err(|e| ConfigError::Invalid {
                name: VAULT_KARTU_KEY_ENV,
                reason: e.to_string(),
            })?;

        let vault_timeout = seconds(
            VAULT_TIMEOUT_SECS_ENV,
            get(VAULT_TIMEOUT_SECS_ENV),
            DEFAULT_VAULT_TIMEOUT_SECS,
        )?;
        let request_timeout = seconds(
            REQUEST_TIMEOUT_SECS_ENV,
            get(REQUEST_TIMEOUT_SECS_ENV),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    reason: format!("expected json or pretty, got {other}"),
                })
            }
        };

        Ok(Self {
            host: or_default(HOST_ENV, DEFAULT_HOST),
            port,
            data_dir: PathBuf::from(or_default(DATA_DIR_ENV, DATA_ROOT)),
            jwt_secret,
            jwt_issuer: get(JWT_ISSUER_ENV),
            vault,
            transit_keys,
            vault_timeout,
            request_timeout,
            tls,
            log_format,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid {
                name: HOST_ENV,
                reason: format!("{e}"),
            })
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

/// Mount paths may be nested but must name something besides slashes.
fn transit_mount(value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid {
            name: VAULT_TRANSIT_MOUNT_ENV,
            reason: format!("{value:?} is not a mount path"),
        });
    }
    Ok(trimmed.to_string())
}

/// Key names become one URL path segment.
fn transit_key(name: &'static str, value: String) -> Result<String, ConfigError> {
    if value.contains('/') || value.chars().any(char::is_whitespace) {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("{value:?} is not a valid transit key name"),
        });
    }
    Ok(value)
}

fn seconds(name: &'static str, raw: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    let secs = match raw {
        Some(raw) => parse_number(name, &raw)?,
        None => default,
    };
    if secs == 0 {
        return Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pii::SensitiveField;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert_eq!(config.jwt_secret.expose_secret(), "s3cret");
        assert!(config.vault.is_none());
        assert!(config.tls.is_none());
        assert_eq!(config.vault_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.transit_keys.key_for(SensitiveField::Nik), "umkm-nik");
        assert_eq!(config.bind_addr().unwrap().port(), 8080);
    }

    #[test]
    fn jwt_secret_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("JWT_SECRET"))));
        assert!(matches!(
            load(&[("JWT_SECRET", "   ")]),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));
    }

    #[test]
    fn vault_needs_addr_and_token() {
        let config = load(&[
            ("JWT_SECRET", "s"),
            ("VAULT_ADDR", "http://vault:8200"),
            ("VAULT_TOKEN", "hvs.abc"),
        ])
        .unwrap();
        let vault = config.vault.unwrap();
        assert_eq!(vault.addr, "http://vault:8200");
        assert_eq!(vault.token.expose_secret(), "hvs.abc");
    }

    #[test]
    fn half_vault_config_is_rejected() {
        let result = load(&[("JWT_SECRET", "s"), ("VAULT_ADDR", "http://vault:8200")]);
        assert!(matches!(result, Err(ConfigError::Missing("VAULT_TOKEN"))));

        let result = load(&[("JWT_SECRET", "s"), ("VAULT_TOKEN", "hvs.abc")]);
        assert!(matches!(result, Err(ConfigError::Missing("VAULT_ADDR"))));
    }

    #[test]
    fn bad_transit_names_report_their_variable() {
        let result = load(&[("JWT_SECRET", "s"), ("VAULT_TRANSIT_MOUNT", "//")]);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "VAULT_TRANSIT_MOUNT", .. })
        ));

        let result = load(&[("JWT_SECRET", "s"), ("VAULT_NIK_KEY", "pii/nik")]);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "VAULT_NIK_KEY", .. })
        ));

        let result = load(&[("JWT_SECRET", "s"), ("VAULT_KARTU_KEY", "kartu key")]);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "VAULT_KARTU_KEY", .. })
        ));

        let config = load(&[("JWT_SECRET", "s"), ("VAULT_TRANSIT_MOUNT", "/pii/transit/")]).unwrap();
        assert_eq!(config.transit_keys.mount_path(), "pii/transit");
    }

    #[test]
    fn identical_field_keys_are_rejected() {
        let result = load(&[
            ("JWT_SECRET", "s"),
            ("VAULT_NIK_KEY", "pii"),
            ("VAULT_KARTU_KEY", "pii"),
        ]);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn half_tls_config_is_rejected() {
        let result = load(&[("JWT_SECRET", "s"), ("TLS_CERT_PATH", "/certs/tls.crt")]);
        assert!(matches!(result, Err(ConfigError::Missing("TLS_KEY_PATH"))));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        assert!(load(&[("JWT_SECRET", "s"), ("PORT", "http")]).is_err());
        assert!(load(&[("JWT_SECRET", "s"), ("VAULT_TIMEOUT_SECS", "0")]).is_err());
        assert!(load(&[("JWT_SECRET", "s"), ("LOG_FORMAT", "xml")]).is_err());
    }
}
