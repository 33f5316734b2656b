//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::{
    build_access_config, AccessConfig, AccessOptions, AuthMethod, CredentialChecker,
    DigestAlgorithm, HashedChecker, InMemoryChecker, SystemChecker, DEFAULT_AUTH_REALM,
};
use crate::auth::system::{DEFAULT_PASSWD_PATH, DEFAULT_SHADOW_PATH};
use crate::error::ConfigError;

/// Root configuration for the REST server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (interface, port).
    pub listener: ListenerConfig,

    /// Authentication settings.
    pub access: AccessSettings,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind ("0.0.0.0" for all).
    pub interface: String,

    /// TCP port. 0 is only accepted programmatically (ephemeral port).
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            interface: "0.0.0.0".to_string(),
            port: 8888,
        }
    }
}

/// Backing store for credential checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckerKind {
    /// Cleartext secrets from `users`.
    #[default]
    Memory,
    /// Argon2 PHC strings from `users`.
    Hashed,
    /// passwd/shadow files.
    System,
}

/// One configured user.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserEntry {
    pub username: String,

    /// Display name; defaults to the username.
    #[serde(default)]
    pub full_name: Option<String>,

    /// Cleartext password or PHC hash, depending on the checker kind.
    pub secret: String,
}

impl UserEntry {
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.username)
    }
}

/// Authentication settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessSettings {
    pub method: AuthMethod,

    /// Realm advertised in challenges.
    pub realm: String,

    pub checker: CheckerKind,

    /// "md5" or "sha-256".
    pub digest_algorithm: String,

    pub users: Vec<UserEntry>,

    pub passwd_path: PathBuf,

    pub shadow_path: PathBuf,
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            method: AuthMethod::Open,
            realm: DEFAULT_AUTH_REALM.to_string(),
            checker: CheckerKind::Memory,
            digest_algorithm: "md5".to_string(),
            users: Vec::new(),
            passwd_path: PathBuf::from(DEFAULT_PASSWD_PATH),
            shadow_path: PathBuf::from(DEFAULT_SHADOW_PATH),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl ServerConfig {
    /// Build the credentials checker described by `[access]`.
    ///
    /// Returns `None` when the method needs no checker.
    pub async fn build_checker(&self) -> Result<Option<Arc<dyn CredentialChecker>>, ConfigError> {
        let access = &self.access;
        if !access.method.requires_checker() {
            return Ok(None);
        }

        let checker: Arc<dyn CredentialChecker> = match access.checker {
            CheckerKind::Memory => Arc::new(InMemoryChecker::from_entries(
                access
                    .users
                    .iter()
                    .map(|u| (u.username.as_str(), u.display_name(), u.secret.as_str())),
            )),
            CheckerKind::Hashed => Arc::new(HashedChecker::from_entries(
                access
                    .users
                    .iter()
                    .map(|u| (u.username.as_str(), u.display_name(), u.secret.as_str())),
            )?),
            CheckerKind::System => Arc::new(
                SystemChecker::open(&access.passwd_path, access.shadow_path.clone()).await?,
            ),
        };

        tracing::info!(kind = ?access.checker, checker = ?checker, "Credentials checker ready");
        Ok(Some(checker))
    }

    /// Build the access configuration described by `[access]`.
    ///
    /// Digest access is refused unless the checker holds cleartext secrets.
    pub async fn build_access(&self) -> Result<Arc<dyn AccessConfig>, ConfigError> {
        if self.access.method == AuthMethod::Digest && self.access.checker != CheckerKind::Memory {
            return Err(ConfigError::IncompatibleChecker {
                method: self.access.method,
                checker: self.access.checker,
            });
        }
        let options = AccessOptions {
            realm: self.access.realm.clone(),
            digest_algorithm: self.access.digest_algorithm.parse::<DigestAlgorithm>()?,
        };
        let checker = self.build_checker().await?;
        build_access_config(self.access.method, checker, &options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.interface, "0.0.0.0");
        assert_eq!(config.listener.port, 8888);
        assert_eq!(config.access.method, AuthMethod::Open);
        assert_eq!(config.access.realm, "local");
        assert_eq!(config.timeouts.request_secs, 30);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_parse_access_section() {
        let config: ServerConfig = toml::from_str(
            r#"
            [access]
            method = "basic"
            checker = "memory"

            [[access.users]]
            username = "admin"
            full_name = "Administrator"
            secret = "admin"

            [[access.users]]
            username = "guest"
            secret = "guest"
            "#,
        )
        .unwrap();

        assert_eq!(config.access.method, AuthMethod::Basic);
        assert_eq!(config.access.users.len(), 2);
        assert_eq!(config.access.users[0].display_name(), "Administrator");
        assert_eq!(config.access.users[1].display_name(), "guest");
    }

    #[tokio::test]
    async fn test_build_access() {
        let mut config = ServerConfig::default();
        assert!(config.build_checker().await.unwrap().is_none());
        assert_eq!(config.build_access().await.unwrap().method(), AuthMethod::Open);

        config.access.method = AuthMethod::Digest;
        config.access.digest_algorithm = "sha-256".into();
        config.access.users.push(UserEntry {
            username: "admin".into(),
            full_name: None,
            secret: "admin".into(),
        });

        let checker = config.build_checker().await.unwrap().unwrap();
        assert_eq!(checker.users().len(), 1);
        assert_eq!(config.build_access().await.unwrap().method(), AuthMethod::Digest);

        config.access.digest_algorithm = "md5-sess".into();
        assert!(matches!(
            config.build_access().await,
            Err(ConfigError::UnsupportedDigestAlgorithm(_))
        ));
    }

    #[tokio::test]
    async fn test_digest_refuses_non_memory_checker() {
        let mut config = ServerConfig::default();
        config.access.method = AuthMethod::Digest;
        config.access.checker = CheckerKind::Hashed;
        config.access.users.push(UserEntry {
            username: "admin".into(),
            full_name: None,
            secret: crate::auth::hash_password(b"admin").unwrap(),
        });

        let err = config.build_access().await.unwrap_err();
        assert!(matches!(
            err,
            ConfigError::IncompatibleChecker {
                method: AuthMethod::Digest,
                checker: CheckerKind::Hashed,
            }
        ));
        assert_eq!(err.to_string(), "Digest access cannot use the Hashed checker");

        config.access.checker = CheckerKind::System;
        assert!(matches!(
            config.build_access().await,
            Err(ConfigError::IncompatibleChecker {
                checker: CheckerKind::System,
                ..
            })
        ));

        // The same users are fine behind Basic
        config.access.method = AuthMethod::Basic;
        config.access.checker = CheckerKind::Hashed;
        assert_eq!(config.build_access().await.unwrap().method(), AuthMethod::Basic);
    }
}
