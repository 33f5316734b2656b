//! Setup-time error taxonomy.
//!
//! Everything in here is fatal: a `ConfigError` aborts startup and is never
//! produced while serving traffic. Request-time outcomes (not found,
//! unauthorized) live next to the code that produces them.

use std::path::PathBuf;

use crate::auth::AuthMethod;
use crate::config::schema::CheckerKind;
use crate::config::validation::ValidationError;

/// Error raised while assembling routes, access configuration or settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Basic, Digest and TLS-SRP access cannot be built without a checker.
    #[error("{0} access requires a credentials checker")]
    MissingChecker(AuthMethod),

    /// The checker cannot verify the credentials this method produces.
    #[error("{method} access cannot use the {checker:?} checker")]
    IncompatibleChecker {
        method: AuthMethod,
        checker: CheckerKind,
    },

    /// Reserved access method with no implementation.
    #[error("{0} access is not implemented")]
    NotImplemented(AuthMethod),

    /// A route pattern failed to compile.
    #[error("invalid route pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unsupported digest algorithm '{0}'")]
    UnsupportedDigestAlgorithm(String),

    /// A stored secret is not a usable password hash.
    #[error("invalid password hash for user '{user}': {reason}")]
    InvalidPasswordHash { user: String, reason: String },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
