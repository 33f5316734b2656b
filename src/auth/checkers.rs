//! Credential checkers.
//!
//! # Responsibilities
//! - Verify a username/secret pair against a backing store
//! - Produce an `Identity` or a `Rejected` reason
//! - Hand out copies of the user directory
//!
//! # Design Decisions
//! - Stores are deep-copied at construction and never mutated by `check`
//! - Secret comparison is constant time
//! - Verification is async so slow backends never block the runtime

use std::collections::BTreeMap;
use std::fmt;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::auth::identity::{Credentials, Identity};
use crate::error::ConfigError;

/// Username → display name.
pub type UserDirectory = BTreeMap<Vec<u8>, String>;

/// Why a credential check failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejected {
    #[error("No such user")]
    NoSuchUser,

    #[error("Bad password")]
    BadPassword,

    /// The checker cannot verify this kind of credentials.
    #[error("Unsupported credentials")]
    UnsupportedCredentials,

    /// Normalized failure from an external identity source.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// Verifies credentials against a backing identity store.
#[async_trait]
pub trait CredentialChecker: Send + Sync + fmt::Debug {
    /// Check decoded credentials.
    async fn check(&self, credentials: &Credentials) -> Result<Identity, Rejected>;

    /// Check a username and cleartext secret.
    async fn verify(&self, username: &[u8], secret: &[u8]) -> Result<Identity, Rejected> {
        self.check(&Credentials::password(username, secret)).await
    }

    /// Copy of the known users.
    fn users(&self) -> UserDirectory;
}

fn identity_for(users: &UserDirectory, username: &[u8]) -> Identity {
    let display_name = users
        .get(username)
        .cloned()
        .unwrap_or_else(|| String::from_utf8_lossy(username).into_owned());
    Identity::new(username, display_name)
}

/// Checker over an in-memory map of cleartext secrets.
#[derive(Clone)]
pub struct InMemoryChecker {
    users: UserDirectory,
    passwords: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryChecker {
    pub fn new(users: &UserDirectory, passwords: &BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        Self {
            users: users.clone(),
            passwords: passwords.clone(),
        }
    }

    /// Build from `(username, full name, password)` rows.
    pub fn from_entries<I, U, N, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (U, N, P)>,
        U: Into<Vec<u8>>,
        N: Into<String>,
        P: Into<Vec<u8>>,
    {
        let mut users = UserDirectory::new();
        let mut passwords = BTreeMap::new();
        for (username, fullname, password) in entries {
            let username = username.into();
            users.insert(username.clone(), fullname.into());
            passwords.insert(username, password.into());
        }
        Self { users, passwords }
    }
}

impl fmt::Debug for InMemoryChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryChecker")
            .field("users", &self.users.len())
            .finish()
    }
}

#[async_trait]
impl CredentialChecker for InMemoryChecker {
    async fn check(&self, credentials: &Credentials) -> Result<Identity, Rejected> {
        let username = credentials.username();
        let stored = self.passwords.get(username).ok_or(Rejected::NoSuchUser)?;

        let valid = match credentials {
            Credentials::UsernamePassword { password, .. } => {
                bool::from(password.as_slice().ct_eq(stored.as_slice()))
            }
            Credentials::Digest(digest) => digest.check_password(stored),
        };

        if valid {
            Ok(identity_for(&self.users, username))
        } else {
            Err(Rejected::BadPassword)
        }
    }

    fn users(&self) -> UserDirectory {
        self.users.clone()
    }
}

/// Checker over a map of Argon2 PHC hash strings.
#[derive(Clone)]
pub struct HashedChecker {
    users: UserDirectory,
    hashes: BTreeMap<Vec<u8>, String>,
}

impl HashedChecker {
    /// Every stored hash must parse as a PHC string.
    pub fn new(
        users: &UserDirectory,
        hashes: &BTreeMap<Vec<u8>, String>,
    ) -> Result<Self, ConfigError> {
        for (username, hash) in hashes {
            PasswordHash::new(hash).map_err(|e| ConfigError::InvalidPasswordHash {
                user: String::from_utf8_lossy(username).into_owned(),
                reason: e.to_string(),
            })?;
        }

        Ok(Self {
            users: users.clone(),
            hashes: hashes.clone(),
        })
    }

    /// Build from `(username, full name, PHC hash)` rows.
    pub fn from_entries<I, U, N, H>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (U, N, H)>,
        U: Into<Vec<u8>>,
        N: Into<String>,
        H: Into<String>,
    {
        let mut users = UserDirectory::new();
        let mut hashes = BTreeMap::new();
        for (username, fullname, hash) in entries {
            let username = username.into();
            users.insert(username.clone(), fullname.into());
            hashes.insert(username, hash.into());
        }
        Self::new(&users, &hashes)
    }
}

impl fmt::Debug for HashedChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedChecker")
            .field("users", &self.users.len())
            .finish()
    }
}

#[async_trait]
impl CredentialChecker for HashedChecker {
    async fn check(&self, credentials: &Credentials) -> Result<Identity, Rejected> {
        let Credentials::UsernamePassword { username, password } = credentials else {
            return Err(Rejected::UnsupportedCredentials);
        };

        let stored = self.hashes.get(username).ok_or(Rejected::NoSuchUser)?;

        if verify_password_hash(password, stored) {
            Ok(identity_for(&self.users, username))
        } else {
            Err(Rejected::BadPassword)
        }
    }

    fn users(&self) -> UserDirectory {
        self.users.clone()
    }
}

/// Hash a password into an Argon2id PHC string.
pub fn hash_password(password: &[u8]) -> Result<String, ConfigError> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);

    let invalid = |reason: String| ConfigError::InvalidPasswordHash {
        user: String::new(),
        reason,
    };

    let salt = SaltString::from_b64(&STANDARD_NO_PAD.encode(salt)).map_err(|e| invalid(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password, &salt)
        .map_err(|e| invalid(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verify a password against a PHC string. Unparseable hashes never match.
pub fn verify_password_hash(password: &[u8], hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password, &parsed).is_ok(),
        Err(_) => false,
    }
}
