//! Realm: maps an authenticated identity to what it may reach.

use std::fmt;
use std::sync::Arc;

use crate::auth::checkers::UserDirectory;
use crate::auth::identity::Identity;
use crate::routing::Resource;

/// Avatar kinds a caller can ask the realm for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Displayable descriptor of the authorized user.
    AuthorizedUser,
    /// The resource tree to serve.
    Resource,
}

/// Descriptor of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedUser {
    pub username: Vec<u8>,
    pub fullname: String,
}

impl fmt::Display for AuthorizedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: ({})",
            String::from_utf8_lossy(&self.username),
            self.fullname
        )
    }
}

/// What the realm hands back.
pub enum Avatar {
    AuthorizedUser(AuthorizedUser),
    Resource(Arc<dyn Resource>),
}

impl Avatar {
    pub fn capability(&self) -> Capability {
        match self {
            Avatar::AuthorizedUser(_) => Capability::AuthorizedUser,
            Avatar::Resource(_) => Capability::Resource,
        }
    }
}

impl fmt::Debug for Avatar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Avatar::AuthorizedUser(user) => f.debug_tuple("AuthorizedUser").field(user).finish(),
            Avatar::Resource(_) => f.write_str("Resource(..)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RealmError {
    /// Identity missing from the known users (or anonymous).
    #[error("unknown user '{0}'")]
    UnknownUser(String),

    #[error("None of the requested interfaces are supported")]
    UnsupportedCapability,
}

/// Serves one resource tree to every authenticated user.
pub struct Realm {
    resource: Arc<dyn Resource>,
    users: UserDirectory,
}

impl Realm {
    pub fn new(resource: Arc<dyn Resource>, users: UserDirectory) -> Self {
        Self { resource, users }
    }

    /// Return the first supported avatar among `capabilities`.
    /// A user descriptor takes precedence over the resource.
    pub fn request_avatar(
        &self,
        identity: Option<&Identity>,
        capabilities: &[Capability],
    ) -> Result<Avatar, RealmError> {
        if capabilities.contains(&Capability::AuthorizedUser) {
            let identity = identity.ok_or_else(|| RealmError::UnknownUser("anonymous".into()))?;
            let fullname = self
                .users
                .get(identity.id())
                .ok_or_else(|| RealmError::UnknownUser(identity.username_lossy()))?;

            return Ok(Avatar::AuthorizedUser(AuthorizedUser {
                username: identity.id().to_vec(),
                fullname: fullname.clone(),
            }));
        }

        if capabilities.contains(&Capability::Resource) {
            return Ok(Avatar::Resource(Arc::clone(&self.resource)));
        }

        Err(RealmError::UnsupportedCapability)
    }
}

impl fmt::Debug for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Realm")
            .field("users", &self.users.len())
            .finish_non_exhaustive()
    }
}
