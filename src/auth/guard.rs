//! Challenge/verify wrapper placed in front of a resource.
//!
//! # Responsibilities
//! - Pick the credential factory matching the `Authorization` scheme
//! - Decode credentials and await the checker
//! - Ask the realm for the resource avatar and render it on success
//! - Answer 401 with every factory's challenge otherwise
//!
//! # Design Decisions
//! - Fail closed: the wrapped resource is only reached after `check` succeeds
//! - Missing, malformed and rejected credentials all produce the same 401
//! - Dropping the render future cancels the check before rendering starts

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::response::Response;
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};

use crate::auth::checkers::CredentialChecker;
use crate::auth::identity::Credentials;
use crate::auth::realm::{Avatar, Capability, Realm};
use crate::http::response::unauthorized;
use crate::observability::metrics;
use crate::routing::{Resource, RestRequest};

/// Credentials in an `Authorization` header could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DecodeError {
    message: String,
}

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Render `value` as an auth-param quoted-string.
pub fn quote_param(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// One HTTP authentication scheme.
pub trait CredentialFactory: Send + Sync + fmt::Debug {
    /// Lowercase scheme name as it appears in `Authorization`.
    fn scheme(&self) -> &'static str;

    /// Full `WWW-Authenticate` value for this scheme.
    fn challenge(&self, request: &RestRequest) -> String;

    /// Decode the part of the `Authorization` header after the scheme.
    fn decode(&self, response: &str, request: &RestRequest) -> Result<Credentials, DecodeError>;
}

// Clients differ on padding; accept both.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// `Basic` scheme: base64 of `username:password`.
#[derive(Debug, Clone)]
pub struct BasicCredentialFactory {
    realm: String,
}

impl BasicCredentialFactory {
    pub fn new(realm: impl Into<String>) -> Self {
        Self { realm: realm.into() }
    }
}

impl CredentialFactory for BasicCredentialFactory {
    fn scheme(&self) -> &'static str {
        "basic"
    }

    fn challenge(&self, _request: &RestRequest) -> String {
        format!("Basic realm={}", quote_param(&self.realm))
    }

    fn decode(&self, response: &str, _request: &RestRequest) -> Result<Credentials, DecodeError> {
        let decoded = LENIENT_BASE64
            .decode(response.trim())
            .map_err(|_| DecodeError::new("Invalid credentials"))?;

        let colon = decoded
            .iter()
            .position(|b| *b == b':')
            .ok_or_else(|| DecodeError::new("Invalid credentials"))?;

        Ok(Credentials::password(
            &decoded[..colon],
            &decoded[colon + 1..],
        ))
    }
}

/// Resource that authenticates before delegating to the realm's resource.
pub struct AuthSessionWrapper {
    realm: Realm,
    checker: Arc<dyn CredentialChecker>,
    factories: Vec<Arc<dyn CredentialFactory>>,
}

impl AuthSessionWrapper {
    pub fn new(
        realm: Realm,
        checker: Arc<dyn CredentialChecker>,
        factories: Vec<Arc<dyn CredentialFactory>>,
    ) -> Self {
        Self {
            realm,
            checker,
            factories,
        }
    }

    fn challenge(&self, request: &RestRequest) -> Response {
        unauthorized(self.factories.iter().map(|f| f.challenge(request)))
    }

    fn select(&self, header: &str) -> Option<(&Arc<dyn CredentialFactory>, String)> {
        let (scheme, rest) = header.split_once(' ').unwrap_or((header, ""));
        self.factories
            .iter()
            .find(|f| f.scheme().eq_ignore_ascii_case(scheme))
            .map(|f| (f, rest.trim().to_string()))
    }
}

impl fmt::Debug for AuthSessionWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSessionWrapper")
            .field("checker", &self.checker)
            .field("factories", &self.factories)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Resource for AuthSessionWrapper {
    async fn render(&self, mut request: RestRequest) -> anyhow::Result<Response> {
        let Some(header) = request.header(AUTHORIZATION.as_str()).map(str::to_owned) else {
            tracing::debug!(path = %request.path(), "No credentials supplied");
            return Ok(self.challenge(&request));
        };

        let Some((factory, response)) = self.select(&header) else {
            tracing::debug!(path = %request.path(), "Unsupported authorization scheme");
            return Ok(self.challenge(&request));
        };

        let credentials = match factory.decode(&response, &request) {
            Ok(credentials) => credentials,
            Err(e) => {
                tracing::info!(scheme = factory.scheme(), error = %e, "Malformed credentials");
                return Ok(self.challenge(&request));
            }
        };

        let identity = match self.checker.check(&credentials).await {
            Ok(identity) => identity,
            Err(reason) => {
                tracing::info!(
                    user = %String::from_utf8_lossy(credentials.username()),
                    reason = %reason,
                    "Login failed"
                );
                metrics::record_auth_failure(factory.scheme());
                return Ok(self.challenge(&request));
            }
        };

        tracing::debug!(user = %identity.username_lossy(), "Login succeeded");

        match self.realm.request_avatar(Some(&identity), &[Capability::Resource])? {
            Avatar::Resource(resource) => {
                request.set_identity(identity);
                resource.render(request).await
            }
            Avatar::AuthorizedUser(user) => {
                anyhow::bail!("realm returned a user descriptor for {user} instead of a resource")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::checkers::{InMemoryChecker, Rejected, UserDirectory};
    use crate::auth::identity::Identity;
    use crate::routing::{ApiResource, Reply};
    use axum::http::{header::WWW_AUTHENTICATE, Method, StatusCode};
    use axum::response::IntoResponse;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Accepts everyone, after a delay.
    #[derive(Debug)]
    struct SlowChecker;

    #[async_trait]
    impl CredentialChecker for SlowChecker {
        async fn check(&self, credentials: &Credentials) -> Result<Identity, Rejected> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(Identity::new(credentials.username(), "Slow"))
        }

        fn users(&self) -> UserDirectory {
            UserDirectory::from([(b"admin".to_vec(), "Administrator".to_string())])
        }
    }

    /// Records whether it was ever rendered.
    #[derive(Debug)]
    struct FlagResource(Arc<AtomicBool>);

    #[async_trait]
    impl Resource for FlagResource {
        async fn render(&self, _request: RestRequest) -> anyhow::Result<Response> {
            self.0.store(true, Ordering::SeqCst);
            Ok(axum::Json(json!("rendered")).into_response())
        }
    }

    fn wrapper() -> AuthSessionWrapper {
        let api = ApiResource::builder()
            .get("^/whoami$", |req, _| {
                let name = req.identity().map(|i| i.display_name().to_string());
                Ok(json!({ "user": name }).into())
            })
            .get("^/version$", |_, _| Ok(Reply::from("0.1.0")))
            .build_shared()
            .unwrap();

        let checker: Arc<dyn CredentialChecker> =
            Arc::new(InMemoryChecker::from_entries([("admin", "Administrator", "admin")]));
        let realm = Realm::new(api, checker.users());

        AuthSessionWrapper::new(
            realm,
            checker,
            vec![Arc::new(BasicCredentialFactory::new("local"))],
        )
    }

    fn basic(user: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_basic_decode() {
        let factory = BasicCredentialFactory::new("local");
        let req = RestRequest::new(Method::GET, "/");

        let creds = factory.decode(&STANDARD.encode("admin:pa:ss"), &req).unwrap();
        match creds {
            Credentials::UsernamePassword { username, password } => {
                assert_eq!(username, b"admin");
                assert_eq!(password, b"pa:ss");
            }
            other => panic!("unexpected credentials {other:?}"),
        }

        // Unpadded input
        assert!(factory.decode("YWRtaW46YWRtaW4", &req).is_ok());

        assert!(factory.decode(&STANDARD.encode("nocolon"), &req).is_err());
        assert!(factory.decode("!!!", &req).is_err());
    }

    #[tokio::test]
    async fn test_missing_credentials_challenge() {
        let res = wrapper()
            .render(RestRequest::new(Method::GET, "/version"))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers().get(WWW_AUTHENTICATE).unwrap(), "Basic realm=\"local\"");
    }

    #[tokio::test]
    async fn test_valid_credentials_attach_identity() {
        let req = RestRequest::new(Method::GET, "/whoami")
            .with_header("authorization", &basic("admin", "admin"));
        let res = wrapper().render(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await, json!({ "user": "Administrator" }));
    }

    #[tokio::test]
    async fn test_invalid_credentials() {
        for header in [
            basic("admin", "wrong"),
            basic("ghost", "admin"),
            "Basic ???".to_string(),
            "Bearer token".to_string(),
        ] {
            let req = RestRequest::new(Method::GET, "/version").with_header("authorization", &header);
            let res = wrapper().render(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "header {header}");
            assert!(res.headers().contains_key(WWW_AUTHENTICATE));
        }
    }

    #[tokio::test]
    async fn test_cancelled_check_never_renders() {
        let rendered = Arc::new(AtomicBool::new(false));
        let checker: Arc<dyn CredentialChecker> = Arc::new(SlowChecker);
        let realm = Realm::new(Arc::new(FlagResource(rendered.clone())), checker.users());
        let wrapper = AuthSessionWrapper::new(
            realm,
            checker,
            vec![Arc::new(BasicCredentialFactory::new("local"))],
        );

        let req = RestRequest::new(Method::GET, "/")
            .with_header("authorization", &basic("admin", "x"));
        let result = tokio::time::timeout(Duration::from_millis(50), wrapper.render(req)).await;
        assert!(result.is_err());

        // Outlive the checker delay; the dropped future must stay dead
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!rendered.load(Ordering::SeqCst));

        // Uncancelled, the same wrapper does reach the resource
        let req = RestRequest::new(Method::GET, "/")
            .with_header("authorization", &basic("admin", "x"));
        let res = wrapper.render(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(rendered.load(Ordering::SeqCst));
    }

    #[test]
    fn test_quote_param() {
        assert_eq!(quote_param("local"), "\"local\"");
        assert_eq!(quote_param(r#"a "b" \ c"#), r#""a \"b\" \\ c""#);

        let factory = BasicCredentialFactory::new(r#"the "lab""#);
        let challenge = factory.challenge(&RestRequest::new(Method::GET, "/"));
        assert_eq!(challenge, r#"Basic realm="the \"lab\"""#);
    }
}
