//! Authenticated identities and the credentials that produce them.

use std::fmt;

use crate::auth::digest::DigestCredentials;

/// Who the checker says the caller is.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    id: Vec<u8>,
    display_name: String,
}

impl Identity {
    pub fn new(id: impl Into<Vec<u8>>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    /// Opaque identifier, the login name for every shipped checker.
    pub fn id(&self) -> &[u8] {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Identifier for logs and display.
    pub fn username_lossy(&self) -> String {
        String::from_utf8_lossy(&self.id).into_owned()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.username_lossy())
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// Credentials decoded from an `Authorization` header.
#[derive(Clone)]
pub enum Credentials {
    /// Username and cleartext secret (Basic).
    UsernamePassword { username: Vec<u8>, password: Vec<u8> },
    /// Digest response; verifiable only against a cleartext secret.
    Digest(DigestCredentials),
}

impl Credentials {
    pub fn password(username: impl Into<Vec<u8>>, password: impl Into<Vec<u8>>) -> Self {
        Credentials::UsernamePassword {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &[u8] {
        match self {
            Credentials::UsernamePassword { username, .. } => username,
            Credentials::Digest(digest) => digest.username(),
        }
    }
}

// Secrets stay out of Debug output.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Credentials::UsernamePassword { .. } => "UsernamePassword",
            Credentials::Digest(_) => "Digest",
        };
        f.debug_struct(kind)
            .field("username", &String::from_utf8_lossy(self.username()))
            .finish_non_exhaustive()
    }
}
