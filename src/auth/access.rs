//! Access configurations: one strategy per authentication method.
//!
//! Each configuration knows how to wrap a resource so that requests are
//! authenticated before they reach it. Open access hands the resource back
//! untouched.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::checkers::CredentialChecker;
use crate::auth::digest::{DigestAlgorithm, DigestCredentialFactory};
use crate::auth::guard::{AuthSessionWrapper, BasicCredentialFactory, CredentialFactory};
use crate::auth::realm::Realm;
use crate::error::ConfigError;
use crate::routing::Resource;

/// Realm advertised in challenges unless configured otherwise.
pub const DEFAULT_AUTH_REALM: &str = "local";

/// Supported (and reserved) authentication methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMethod {
    #[default]
    Open,
    Basic,
    Digest,
    Tls,
    TlsSrp,
    WebToken,
}

impl AuthMethod {
    /// Whether the method cannot be built without a credentials checker.
    pub fn requires_checker(&self) -> bool {
        matches!(self, AuthMethod::Basic | AuthMethod::Digest | AuthMethod::TlsSrp)
    }

    pub fn is_implemented(&self) -> bool {
        matches!(self, AuthMethod::Open | AuthMethod::Basic | AuthMethod::Digest)
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthMethod::Open => "Open",
            AuthMethod::Basic => "Basic",
            AuthMethod::Digest => "Digest",
            AuthMethod::Tls => "TLS",
            AuthMethod::TlsSrp => "TLS-SRP",
            AuthMethod::WebToken => "WebToken",
        };
        f.write_str(name)
    }
}

/// Strategy that secures a resource for one authentication method.
pub trait AccessConfig: Send + Sync + fmt::Debug {
    fn method(&self) -> AuthMethod;

    fn realm_name(&self) -> &str;

    /// Wrap `resource` so requests are authenticated before reaching it.
    fn secure_resource(&self, resource: Arc<dyn Resource>)
        -> Result<Arc<dyn Resource>, ConfigError>;
}

/// No authentication.
#[derive(Debug, Clone)]
pub struct OpenAccessConfig {
    realm: String,
}

impl OpenAccessConfig {
    pub fn new() -> Self {
        Self {
            realm: DEFAULT_AUTH_REALM.to_string(),
        }
    }
}

impl Default for OpenAccessConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessConfig for OpenAccessConfig {
    fn method(&self) -> AuthMethod {
        AuthMethod::Open
    }

    fn realm_name(&self) -> &str {
        &self.realm
    }

    fn secure_resource(
        &self,
        resource: Arc<dyn Resource>,
    ) -> Result<Arc<dyn Resource>, ConfigError> {
        Ok(resource)
    }
}

fn guarded(
    resource: Arc<dyn Resource>,
    checker: &Arc<dyn CredentialChecker>,
    factory: Arc<dyn CredentialFactory>,
) -> Arc<dyn Resource> {
    let realm = Realm::new(resource, checker.users());
    Arc::new(AuthSessionWrapper::new(
        realm,
        Arc::clone(checker),
        vec![factory],
    ))
}

/// HTTP Basic authentication.
#[derive(Debug, Clone)]
pub struct BasicAccessConfig {
    checker: Arc<dyn CredentialChecker>,
    realm: String,
}

impl BasicAccessConfig {
    pub fn new(checker: Arc<dyn CredentialChecker>, realm: impl Into<String>) -> Self {
        Self {
            checker,
            realm: realm.into(),
        }
    }

    pub fn checker(&self) -> &Arc<dyn CredentialChecker> {
        &self.checker
    }
}

impl AccessConfig for BasicAccessConfig {
    fn method(&self) -> AuthMethod {
        AuthMethod::Basic
    }

    fn realm_name(&self) -> &str {
        &self.realm
    }

    fn secure_resource(
        &self,
        resource: Arc<dyn Resource>,
    ) -> Result<Arc<dyn Resource>, ConfigError> {
        let factory = Arc::new(BasicCredentialFactory::new(self.realm.clone()));
        Ok(guarded(resource, &self.checker, factory))
    }
}

/// HTTP Digest authentication.
#[derive(Debug, Clone)]
pub struct DigestAccessConfig {
    checker: Arc<dyn CredentialChecker>,
    realm: String,
    algorithm: DigestAlgorithm,
}

impl DigestAccessConfig {
    pub fn new(
        checker: Arc<dyn CredentialChecker>,
        realm: impl Into<String>,
        algorithm: DigestAlgorithm,
    ) -> Self {
        Self {
            checker,
            realm: realm.into(),
            algorithm,
        }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }
}

impl AccessConfig for DigestAccessConfig {
    fn method(&self) -> AuthMethod {
        AuthMethod::Digest
    }

    fn realm_name(&self) -> &str {
        &self.realm
    }

    fn secure_resource(
        &self,
        resource: Arc<dyn Resource>,
    ) -> Result<Arc<dyn Resource>, ConfigError> {
        // Fresh private key per secured tree
        let factory = Arc::new(DigestCredentialFactory::new(self.algorithm, self.realm.clone()));
        Ok(guarded(resource, &self.checker, factory))
    }
}

/// TLS, TLS-SRP and WebToken: representable but not servable.
#[derive(Debug, Clone)]
pub struct UnimplementedAccessConfig {
    method: AuthMethod,
    checker: Option<Arc<dyn CredentialChecker>>,
    realm: String,
}

impl UnimplementedAccessConfig {
    pub fn new(
        method: AuthMethod,
        checker: Option<Arc<dyn CredentialChecker>>,
        realm: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        if method.requires_checker() && checker.is_none() {
            return Err(ConfigError::MissingChecker(method));
        }
        Ok(Self {
            method,
            checker,
            realm: realm.into(),
        })
    }

    pub fn checker(&self) -> Option<&Arc<dyn CredentialChecker>> {
        self.checker.as_ref()
    }
}

impl AccessConfig for UnimplementedAccessConfig {
    fn method(&self) -> AuthMethod {
        self.method
    }

    fn realm_name(&self) -> &str {
        &self.realm
    }

    fn secure_resource(
        &self,
        _resource: Arc<dyn Resource>,
    ) -> Result<Arc<dyn Resource>, ConfigError> {
        Err(ConfigError::NotImplemented(self.method))
    }
}

/// Method-independent knobs for [`build_access_config`].
#[derive(Debug, Clone)]
pub struct AccessOptions {
    pub realm: String,
    pub digest_algorithm: DigestAlgorithm,
}

impl Default for AccessOptions {
    fn default() -> Self {
        Self {
            realm: DEFAULT_AUTH_REALM.to_string(),
            digest_algorithm: DigestAlgorithm::default(),
        }
    }
}

/// Build the access configuration for `method`.
///
/// Basic, Digest and TLS-SRP fail with [`ConfigError::MissingChecker`] when
/// `checker` is `None`. A checker passed to Open access is ignored.
pub fn build_access_config(
    method: AuthMethod,
    checker: Option<Arc<dyn CredentialChecker>>,
    options: &AccessOptions,
) -> Result<Arc<dyn AccessConfig>, ConfigError> {
    let missing = || ConfigError::MissingChecker(method);

    let config: Arc<dyn AccessConfig> = match method {
        AuthMethod::Open => Arc::new(OpenAccessConfig {
            realm: options.realm.clone(),
        }),
        AuthMethod::Basic => Arc::new(BasicAccessConfig::new(
            checker.ok_or_else(missing)?,
            options.realm.clone(),
        )),
        AuthMethod::Digest => Arc::new(DigestAccessConfig::new(
            checker.ok_or_else(missing)?,
            options.realm.clone(),
            options.digest_algorithm,
        )),
        AuthMethod::Tls | AuthMethod::TlsSrp | AuthMethod::WebToken => Arc::new(
            UnimplementedAccessConfig::new(method, checker, options.realm.clone())?,
        ),
    };

    tracing::debug!(method = %method, realm = %config.realm_name(), "Access configuration built");
    Ok(config)
}
