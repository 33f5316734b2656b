//! Checker delegating to the operating system user database.
//!
//! # Responsibilities
//! - Load the user directory from a passwd-format file at startup
//! - Verify secrets against crypt(3) hashes in a shadow-format file
//!
//! # Design Decisions
//! - The shadow file is re-read on every check so password changes apply
//!   without a restart
//! - Hash verification runs on the blocking pool (sha512-crypt is slow)
//! - Every failure is reported as `Rejected::Unauthorized`; callers cannot
//!   tell unknown users from bad passwords

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::auth::checkers::{CredentialChecker, Rejected, UserDirectory};
use crate::auth::identity::{Credentials, Identity};
use crate::error::ConfigError;

pub const DEFAULT_PASSWD_PATH: &str = "/etc/passwd";
pub const DEFAULT_SHADOW_PATH: &str = "/etc/shadow";

#[derive(Clone)]
pub struct SystemChecker {
    users: UserDirectory,
    shadow_path: PathBuf,
}

impl SystemChecker {
    /// Read the user directory from `passwd_path`.
    pub async fn open(
        passwd_path: impl AsRef<Path>,
        shadow_path: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let passwd_path = passwd_path.as_ref();
        let content = tokio::fs::read_to_string(passwd_path)
            .await
            .map_err(|source| ConfigError::Io {
                path: passwd_path.to_path_buf(),
                source,
            })?;

        let users = parse_passwd(&content);
        tracing::info!(
            path = %passwd_path.display(),
            users = users.len(),
            "System user directory loaded"
        );

        Ok(Self::from_directory(users, shadow_path))
    }

    pub fn from_directory(users: UserDirectory, shadow_path: impl Into<PathBuf>) -> Self {
        Self {
            users,
            shadow_path: shadow_path.into(),
        }
    }

    async fn stored_hash(&self, username: &[u8]) -> Result<String, Rejected> {
        let content = tokio::fs::read_to_string(&self.shadow_path)
            .await
            .map_err(|e| Rejected::Unauthorized(format!("shadow database unavailable: {e}")))?;

        content
            .lines()
            .filter_map(|line| {
                let mut fields = line.split(':');
                Some((fields.next()?, fields.next()?))
            })
            .find(|(name, _)| name.as_bytes() == username)
            .map(|(_, hash)| hash.to_string())
            .ok_or_else(|| Rejected::Unauthorized("no shadow entry".into()))
    }
}

/// Parse `name:x:uid:gid:gecos:home:shell` lines. The display name is the
/// first comma-separated GECOS field, or the login name when empty.
fn parse_passwd(content: &str) -> UserDirectory {
    content
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(':').collect();
            let name = *fields.first()?;
            if name.is_empty() {
                return None;
            }
            let gecos = fields.get(4).and_then(|g| g.split(',').next()).unwrap_or("");
            let display = if gecos.is_empty() { name } else { gecos };
            Some((name.as_bytes().to_vec(), display.to_string()))
        })
        .collect()
}

impl fmt::Debug for SystemChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemChecker")
            .field("users", &self.users.len())
            .field("shadow_path", &self.shadow_path)
            .finish()
    }
}

#[async_trait]
impl CredentialChecker for SystemChecker {
    async fn check(&self, credentials: &Credentials) -> Result<Identity, Rejected> {
        let Credentials::UsernamePassword { username, password } = credentials else {
            return Err(Rejected::Unauthorized(
                "digest credentials cannot be checked against the system database".into(),
            ));
        };

        let display_name = self
            .users
            .get(username.as_slice())
            .cloned()
            .ok_or_else(|| Rejected::Unauthorized("unknown user".into()))?;

        let hash = self.stored_hash(username).await?;
        if hash.is_empty() || hash.starts_with('!') || hash.starts_with('*') {
            return Err(Rejected::Unauthorized("account locked".into()));
        }

        let password = password.clone();
        let valid = tokio::task::spawn_blocking(move || pwhash::unix::verify(password, &hash))
            .await
            .map_err(|e| Rejected::Unauthorized(format!("verification aborted: {e}")))?;

        if valid {
            Ok(Identity::new(username.as_slice(), display_name))
        } else {
            Err(Rejected::Unauthorized("bad password".into()))
        }
    }

    fn users(&self) -> UserDirectory {
        self.users.clone()
    }
}
