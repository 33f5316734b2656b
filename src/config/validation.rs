//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that authenticated methods have something to check against
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Detect duplicate users
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use crate::auth::{AuthMethod, DigestAlgorithm};
use crate::config::schema::{CheckerKind, ServerConfig};

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.port must be non-zero")]
    InvalidPort,

    #[error("listener.interface must not be empty")]
    EmptyInterface,

    #[error("{0} access is not implemented")]
    UnimplementedMethod(AuthMethod),

    #[error("{0} access requires at least one user")]
    NoUsers(AuthMethod),

    #[error("duplicate user '{0}'")]
    DuplicateUser(String),

    #[error("user entries must have a non-empty username")]
    EmptyUsername,

    #[error("unsupported digest algorithm '{0}'")]
    DigestAlgorithm(String),

    #[error("access.realm must not be empty")]
    EmptyRealm,

    #[error("access.realm must not contain quotes, backslashes or control characters")]
    InvalidRealm(String),

    #[error("Digest access requires the memory checker, not {0:?}")]
    DigestChecker(CheckerKind),

    #[error("{field} must be greater than zero")]
    NonPositive { field: &'static str },
}

/// Check `config` for semantic errors, collecting every one found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }
    if config.listener.interface.trim().is_empty() {
        errors.push(ValidationError::EmptyInterface);
    }

    validate_access(config, &mut errors);

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::NonPositive {
            field: "timeouts.request_secs",
        });
    }
    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::NonPositive {
            field: "limits.max_body_size",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_access(config: &ServerConfig, errors: &mut Vec<ValidationError>) {
    let access = &config.access;

    if !access.method.is_implemented() {
        errors.push(ValidationError::UnimplementedMethod(access.method));
    }
    if access.realm.trim().is_empty() {
        errors.push(ValidationError::EmptyRealm);
    } else if !is_quotable(&access.realm) {
        errors.push(ValidationError::InvalidRealm(access.realm.clone()));
    }
    if access.digest_algorithm.parse::<DigestAlgorithm>().is_err() {
        errors.push(ValidationError::DigestAlgorithm(access.digest_algorithm.clone()));
    }
    // Digest responses can only be verified against cleartext secrets
    if access.method == AuthMethod::Digest && access.checker != CheckerKind::Memory {
        errors.push(ValidationError::DigestChecker(access.checker));
    }

    let mut seen = HashSet::new();
    for user in &access.users {
        if user.username.is_empty() {
            errors.push(ValidationError::EmptyUsername);
        } else if !seen.insert(user.username.as_str()) {
            errors.push(ValidationError::DuplicateUser(user.username.clone()));
        }
    }

    let needs_users = access.method.requires_checker() && access.checker != CheckerKind::System;
    if needs_users && access.users.is_empty() {
        errors.push(ValidationError::NoUsers(access.method));
    }
}

/// Whether `value` can sit inside a quoted-string without escaping.
fn is_quotable(value: &str) -> bool {
    !value.chars().any(|c| c == '"' || c == '\\' || c.is_control())
}
