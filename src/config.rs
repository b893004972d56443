// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `ENCRYPTION_ENABLED` | Seal JSON responses (`1`, `true`, `yes`, `on`) | off |
//! | `JWT_SECRET` | HS256 credential signing secret | Required (requests fail 500 without it) |
//! | `ENCRYPTION_KEY` | Base64 32-byte master key for session keys | Required for handshakes |
//! | `ENCRYPTION_KEY_ID` | Key id stamped on handshake sessions | `k1` |
//! | `AUTH_COOKIE_NAME` | Cookie carrying the credential | `token` |
//! | `LOCAL_ACCOUNT_SUFFIX` | Email suffix of portal-local accounts | `@local` |
//! | `HANDSHAKE_CAPACITY` | Max live handshake sessions | `10000` |
//! | `AUDIT_QUEUE_CAPACITY` | Audit queue bound | `1024` |
//! | `IDENTITY_SEED_FILE` | JSON accounts for the in-memory identity store | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! Missing secrets are not startup errors. They surface where they are
//! needed: a request without `JWT_SECRET` configured is a 500, a handshake
//! without a usable `ENCRYPTION_KEY` is a 500.

use std::path::PathBuf;

use crate::audit::DEFAULT_QUEUE_CAPACITY;
use crate::auth::directory::DEFAULT_LOCAL_SUFFIX;
use crate::crypto::{EnvelopeError, EnvelopeKey};
use crate::session::DEFAULT_CAPACITY;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const ENCRYPTION_ENABLED_ENV: &str = "ENCRYPTION_ENABLED";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const ENCRYPTION_KEY_ENV: &str = "ENCRYPTION_KEY";
pub const ENCRYPTION_KEY_ID_ENV: &str = "ENCRYPTION_KEY_ID";
pub const AUTH_COOKIE_NAME_ENV: &str = "AUTH_COOKIE_NAME";
pub const LOCAL_ACCOUNT_SUFFIX_ENV: &str = "LOCAL_ACCOUNT_SUFFIX";
pub const HANDSHAKE_CAPACITY_ENV: &str = "HANDSHAKE_CAPACITY";
pub const AUDIT_QUEUE_CAPACITY_ENV: &str = "AUDIT_QUEUE_CAPACITY";
pub const IDENTITY_SEED_FILE_ENV: &str = "IDENTITY_SEED_FILE";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default `RUST_LOG` filter.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_KEY_ID: &str = "k1";
const DEFAULT_COOKIE_NAME: &str = "token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Gate configuration.
#[derive(Clone)]
pub struct GateConfig {
    pub host: String,
    pub port: u16,
    /// Response encryption feature flag
    pub encryption_enabled: bool,
    /// HS256 credential secret
    pub signing_secret: Option<String>,
    /// Base64 master key, validated when first used
    pub encryption_key: Option<String>,
    pub default_key_id: String,
    pub credential_cookie: String,
    pub local_account_suffix: String,
    pub handshake_capacity: usize,
    pub audit_queue_capacity: usize,
    pub identity_seed_file: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl GateConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let parsed = |name: &str, default: usize| {
            non_empty(name)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(default)
        };

        Self {
            host: non_empty(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: non_empty(PORT_ENV)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_PORT),
            encryption_enabled: non_empty(ENCRYPTION_ENABLED_ENV)
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            signing_secret: non_empty(JWT_SECRET_ENV),
            encryption_key: non_empty(ENCRYPTION_KEY_ENV),
            default_key_id: non_empty(ENCRYPTION_KEY_ID_ENV)
                .unwrap_or_else(|| DEFAULT_KEY_ID.to_string()),
            credential_cookie: non_empty(AUTH_COOKIE_NAME_ENV)
                .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string()),
            local_account_suffix: non_empty(LOCAL_ACCOUNT_SUFFIX_ENV)
                .unwrap_or_else(|| DEFAULT_LOCAL_SUFFIX.to_string()),
            handshake_capacity: parsed(HANDSHAKE_CAPACITY_ENV, DEFAULT_CAPACITY),
            audit_queue_capacity: parsed(AUDIT_QUEUE_CAPACITY_ENV, DEFAULT_QUEUE_CAPACITY),
            identity_seed_file: non_empty(IDENTITY_SEED_FILE_ENV).map(PathBuf::from),
            log_format: match non_empty(LOG_FORMAT_ENV).as_deref().map(str::trim) {
                Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        }
    }

    /// The master key session keys are derived from.
    pub fn master_key(&self) -> Result<EnvelopeKey, EnvelopeError> {
        let encoded = self.encryption_key.as_deref().ok_or_else(|| {
            EnvelopeError::Configuration(format!("{ENCRYPTION_KEY_ENV} is not set"))
        })?;
        EnvelopeKey::from_base64(encoded)
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl std::fmt::Debug for GateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("encryption_enabled", &self.encryption_enabled)
            .field("signing_secret", &self.signing_secret.as_ref().map(|_| "<set>"))
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "<set>"))
            .field("default_key_id", &self.default_key_id)
            .field("credential_cookie", &self.credential_cookie)
            .field("local_account_suffix", &self.local_account_suffix)
            .field("handshake_capacity", &self.handshake_capacity)
            .field("audit_queue_capacity", &self.audit_queue_capacity)
            .field("identity_seed_file", &self.identity_seed_file)
            .field("log_format", &self.log_format)
            .finish()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64ct::{Base64, Encoding};
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> GateConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GateConfig::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = GateConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert!(!config.encryption_enabled);
        assert!(config.signing_secret.is_none());
        assert_eq!(config.default_key_id, "k1");
        assert_eq!(config.credential_cookie, "token");
        assert_eq!(config.local_account_suffix, "@local");
        assert_eq!(config.handshake_capacity, DEFAULT_CAPACITY);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            (PORT_ENV, "9090"),
            (ENCRYPTION_ENABLED_ENV, "TRUE"),
            (JWT_SECRET_ENV, "s3cret"),
            (ENCRYPTION_KEY_ID_ENV, "k7"),
            (HANDSHAKE_CAPACITY_ENV, "12"),
            (LOG_FORMAT_ENV, "json"),
        ]);
        assert_eq!(config.port, 9090);
        assert!(config.encryption_enabled);
        assert_eq!(config.signing_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.default_key_id, "k7");
        assert_eq!(config.handshake_capacity, 12);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[(JWT_SECRET_ENV, "  "), (PORT_ENV, "nope")]);
        assert!(config.signing_secret.is_none());
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn master_key_requires_32_base64_bytes() {
        assert!(matches!(
            GateConfig::default().master_key(),
            Err(EnvelopeError::Configuration(_))
        ));

        let short_key = Base64::encode_string(&[1u8; 16]);
        let short = config_from(&[(ENCRYPTION_KEY_ENV, short_key.as_str())]);
        assert!(matches!(
            short.master_key(),
            Err(EnvelopeError::Configuration(_))
        ));

        let good_key = Base64::encode_string(&[1u8; 32]);
        let good = config_from(&[(ENCRYPTION_KEY_ENV, good_key.as_str())]);
        assert!(good.master_key().is_ok());
    }

    #[test]
    fn debug_hides_secrets() {
        let config = config_from(&[(JWT_SECRET_ENV, "s3cret")]);
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<set>"));
    }
}
