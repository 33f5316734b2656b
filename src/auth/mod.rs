//! Authentication and access control.
//!
//! # Data Flow
//! ```text
//! Request with Authorization header
//!     → guard.rs (pick factory by scheme, decode credentials)
//!     → checkers.rs / system.rs (verify → Identity or Rejected)
//!     → realm.rs (Identity → Resource avatar)
//!     → wrapped resource renders with the identity attached
//!
//! Missing or bad credentials → 401 + one challenge per factory
//! ```
//!
//! # Design Decisions
//! - `access.rs` holds one `AccessConfig` per method; Open adds no wrapper
//! - Checkers never mutate their stores after construction
//! - Digest is supported but secondary; Basic is the primary path

pub mod access;
pub mod checkers;
pub mod digest;
pub mod guard;
pub mod identity;
pub mod realm;
pub mod system;

pub use access::{
    build_access_config, AccessConfig, AccessOptions, AuthMethod, BasicAccessConfig,
    DigestAccessConfig, OpenAccessConfig, UnimplementedAccessConfig, DEFAULT_AUTH_REALM,
};
pub use checkers::{
    hash_password, CredentialChecker, HashedChecker, InMemoryChecker, Rejected, UserDirectory,
};
pub use digest::{DigestAlgorithm, DigestCredentialFactory, DigestCredentials};
pub use guard::{AuthSessionWrapper, BasicCredentialFactory, CredentialFactory, DecodeError};
pub use identity::{Credentials, Identity};
pub use realm::{Avatar, AuthorizedUser, Capability, Realm, RealmError};
pub use system::SystemChecker;
