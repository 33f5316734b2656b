//! HTTP Digest authentication (RFC 2617 / RFC 7616).
//!
//! # Responsibilities
//! - Issue challenges with a fresh nonce and a signed opaque value
//! - Decode `Authorization: Digest ...` responses
//! - Verify a digest response against a cleartext secret
//!
//! # Design Decisions
//! - `MD5` is the default algorithm, `SHA-256` is offered as well
//! - `MD5-sess` is refused: session keys would need per-client state
//! - The opaque value binds nonce, client address and issue time, signed
//!   with a per-factory private key; challenges expire after 15 minutes
//! - No nonce-count replay tracking; this is the secondary auth path

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use md5::Md5;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::auth::guard::{quote_param, CredentialFactory, DecodeError};
use crate::auth::identity::Credentials;
use crate::error::ConfigError;
use crate::routing::RestRequest;

/// How long an issued challenge stays valid.
pub const CHALLENGE_LIFETIME: Duration = Duration::from_secs(15 * 60);

/// Hash function used to compute digest responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl DigestAlgorithm {
    /// Name as sent in the `algorithm` challenge parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Sha256 => "SHA-256",
        }
    }

    /// Lowercase hex digest of `data`.
    pub fn hash_hex(&self, data: &[u8]) -> String {
        match self {
            DigestAlgorithm::Md5 => hex::encode(Md5::digest(data)),
            DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(DigestAlgorithm::Md5),
            "sha-256" | "sha256" => Ok(DigestAlgorithm::Sha256),
            _ => Err(ConfigError::UnsupportedDigestAlgorithm(s.to_string())),
        }
    }
}

/// A decoded digest response, bound to the request method and realm.
#[derive(Clone)]
pub struct DigestCredentials {
    username: Vec<u8>,
    method: String,
    realm: String,
    fields: HashMap<String, String>,
    algorithm: DigestAlgorithm,
}

impl DigestCredentials {
    /// `fields` are the lowercase-keyed parameters of the `Authorization`
    /// header.
    pub fn new(
        username: impl Into<Vec<u8>>,
        method: impl Into<String>,
        realm: impl Into<String>,
        fields: HashMap<String, String>,
    ) -> Self {
        Self {
            username: username.into(),
            method: method.into(),
            realm: realm.into(),
            fields,
            algorithm: DigestAlgorithm::default(),
        }
    }

    /// Algorithm assumed when the response omits `algorithm`.
    pub fn with_default_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn username(&self) -> &[u8] {
        &self.username
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Recompute the response from `password` and compare.
    pub fn check_password(&self, password: &[u8]) -> bool {
        let Some(response) = self.field("response") else {
            return false;
        };
        let uri = self.field("uri").unwrap_or_default();
        let nonce = self.field("nonce").unwrap_or_default();

        let algorithm = match self.field("algorithm") {
            Some(name) => match name.parse::<DigestAlgorithm>() {
                Ok(algorithm) => algorithm,
                Err(_) => return false,
            },
            None => self.algorithm,
        };

        let mut a1 = Vec::with_capacity(self.username.len() + self.realm.len() + password.len() + 2);
        a1.extend_from_slice(&self.username);
        a1.push(b':');
        a1.extend_from_slice(self.realm.as_bytes());
        a1.push(b':');
        a1.extend_from_slice(password);
        let ha1 = algorithm.hash_hex(&a1);
        let ha2 = algorithm.hash_hex(format!("{}:{}", self.method, uri).as_bytes());

        let expected = match (self.field("nc"), self.field("cnonce")) {
            (Some(nc), Some(cnonce)) => {
                let qop = self.field("qop").unwrap_or("auth");
                algorithm.hash_hex(format!("{ha1}:{nonce}:{nc}:{cnonce}:{qop}:{ha2}").as_bytes())
            }
            _ => algorithm.hash_hex(format!("{ha1}:{nonce}:{ha2}").as_bytes()),
        };

        expected
            .as_bytes()
            .ct_eq(response.to_ascii_lowercase().as_bytes())
            .into()
    }
}

/// Issues digest challenges and decodes digest responses.
pub struct DigestCredentialFactory {
    algorithm: DigestAlgorithm,
    realm: String,
    private_key: [u8; 12],
    lifetime: Duration,
}

impl DigestCredentialFactory {
    pub fn new(algorithm: DigestAlgorithm, realm: impl Into<String>) -> Self {
        let mut private_key = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut private_key);

        Self {
            algorithm,
            realm: realm.into(),
            private_key,
            lifetime: CHALLENGE_LIFETIME,
        }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    fn generate_nonce() -> String {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    fn sign(&self, key: &str) -> String {
        let mut data = key.as_bytes().to_vec();
        data.extend_from_slice(&self.private_key);
        hex::encode(Md5::digest(&data))
    }

    /// Opaque value binding `nonce` to `client` at time `now` (unix secs).
    pub fn generate_opaque(&self, nonce: &str, client: &str, now: u64) -> String {
        let key = format!("{nonce},{client},{now}");
        format!("{}-{}", self.sign(&key), STANDARD.encode(key.as_bytes()))
    }

    /// Check an opaque value returned by the client.
    pub fn verify_opaque(
        &self,
        opaque: &str,
        nonce: &str,
        client: &str,
        now: u64,
    ) -> Result<(), DecodeError> {
        let invalid = || DecodeError::new("Invalid response, invalid opaque value");

        let (digest, encoded) = opaque.split_once('-').ok_or_else(invalid)?;
        let key = STANDARD.decode(encoded).map_err(|_| invalid())?;
        let key = String::from_utf8(key).map_err(|_| invalid())?;

        let parts: Vec<&str> = key.split(',').collect();
        let [key_nonce, key_client, issued] = parts.as_slice() else {
            return Err(invalid());
        };

        if *key_nonce != nonce {
            return Err(DecodeError::new("Invalid response, incompatible opaque/nonce values"));
        }
        if *key_client != client {
            return Err(DecodeError::new("Invalid response, incompatible opaque/client values"));
        }

        let issued: u64 = issued
            .parse()
            .map_err(|_| DecodeError::new("Invalid response, invalid opaque/time values"))?;
        if now.saturating_sub(issued) > self.lifetime.as_secs() {
            return Err(DecodeError::new("Invalid response, incompatible opaque/nonce too old"));
        }

        if !bool::from(self.sign(&key).as_bytes().ct_eq(digest.as_bytes())) {
            return Err(invalid());
        }
        Ok(())
    }

    /// Challenge for `client` issued at `now`.
    pub fn challenge_at(&self, client: &str, now: u64) -> String {
        let nonce = Self::generate_nonce();
        let opaque = self.generate_opaque(&nonce, client, now);
        format!(
            "Digest realm={}, nonce=\"{}\", qop=\"auth\", algorithm={}, opaque=\"{}\"",
            quote_param(&self.realm),
            nonce,
            self.algorithm,
            opaque
        )
    }

    /// Decode a response from `client` for a `method` request on `path`.
    pub fn decode_at(
        &self,
        response: &str,
        method: &str,
        path: &str,
        client: &str,
        now: u64,
    ) -> Result<DigestCredentials, DecodeError> {
        let fields = parse_auth_params(response);

        let username = match fields.get("username") {
            Some(username) if !username.is_empty() => username.clone(),
            _ => return Err(DecodeError::new("Invalid response, no username given.")),
        };
        let opaque = fields
            .get("opaque")
            .ok_or_else(|| DecodeError::new("Invalid response, no opaque given."))?;
        let nonce = fields
            .get("nonce")
            .ok_or_else(|| DecodeError::new("Invalid response, no nonce given."))?;
        let uri = fields
            .get("uri")
            .ok_or_else(|| DecodeError::new("Invalid response, no uri given."))?;

        // The response is only good for the resource it was computed for
        let uri_path = uri.split_once('?').map_or(uri.as_str(), |(path, _)| path);
        if uri_path != path {
            return Err(DecodeError::new("Invalid response, uri does not match request"));
        }

        self.verify_opaque(opaque, nonce, client, now)?;

        Ok(
            DigestCredentials::new(username, method, self.realm.clone(), fields)
                .with_default_algorithm(self.algorithm),
        )
    }
}

impl fmt::Debug for DigestCredentialFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestCredentialFactory")
            .field("algorithm", &self.algorithm)
            .field("realm", &self.realm)
            .finish_non_exhaustive()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn client_address(request: &RestRequest) -> String {
    request.peer().map(|p| p.ip().to_string()).unwrap_or_default()
}

impl CredentialFactory for DigestCredentialFactory {
    fn scheme(&self) -> &'static str {
        "digest"
    }

    fn challenge(&self, request: &RestRequest) -> String {
        self.challenge_at(&client_address(request), now_secs())
    }

    fn decode(&self, response: &str, request: &RestRequest) -> Result<Credentials, DecodeError> {
        self.decode_at(
            response,
            request.method().as_str(),
            request.path(),
            &client_address(request),
            now_secs(),
        )
        .map(Credentials::Digest)
    }
}

/// Parse `key=value, key="quoted value"` lists. Keys are lowercased.
pub fn parse_auth_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ',' {
                break;
            }
            key.push(c);
            chars.next();
        }
        let key = key.trim().to_ascii_lowercase();

        // Bare token without a value
        if chars.peek() != Some(&'=') {
            continue;
        }
        chars.next();

        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    _ => value.push(c),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                value.push(c);
                chars.next();
            }
            value = value.trim().to_string();
        }

        if !key.is_empty() {
            params.insert(key, value);
        }
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 2617 section 3.5 worked example
    fn rfc2617_fields() -> HashMap<String, String> {
        parse_auth_params(
            r#"username="Mufasa",
               realm="testrealm@host.com",
               nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093",
               uri="/dir/index.html",
               qop=auth,
               nc=00000001,
               cnonce="0a4f113b",
               response="6629fae49393a05397450978507c4ef1",
               opaque="5ccc069c403ebaf9f0171e9517f40e41""#,
        )
    }

    #[test]
    fn test_parse_auth_params() {
        let fields = rfc2617_fields();
        assert_eq!(fields.get("username").unwrap(), "Mufasa");
        assert_eq!(fields.get("qop").unwrap(), "auth");
        assert_eq!(fields.get("nc").unwrap(), "00000001");
        assert_eq!(fields.len(), 9);

        let escaped = parse_auth_params(r#"Realm="a \"b\", c", flag"#);
        assert_eq!(escaped.get("realm").unwrap(), "a \"b\", c");
        assert!(!escaped.contains_key("flag"));
    }

    #[test]
    fn test_rfc2617_response() {
        let creds = DigestCredentials::new("Mufasa", "GET", "testrealm@host.com", rfc2617_fields());

        assert!(creds.check_password(b"Circle Of Life"));
        assert!(!creds.check_password(b"circle of life"));
    }

    #[test]
    fn test_response_without_qop() {
        let algorithm = DigestAlgorithm::Md5;
        let ha1 = algorithm.hash_hex(b"admin:local:admin");
        let ha2 = algorithm.hash_hex(b"GET:/version");
        let response = algorithm.hash_hex(format!("{ha1}:abc:{ha2}").as_bytes());

        let mut fields = HashMap::new();
        fields.insert("nonce".to_string(), "abc".to_string());
        fields.insert("uri".to_string(), "/version".to_string());
        fields.insert("response".to_string(), response);

        let creds = DigestCredentials::new("admin", "GET", "local", fields);
        assert!(creds.check_password(b"admin"));
        assert!(!creds.check_password(b"nimda"));
    }

    #[test]
    fn test_md5_sess_rejected() {
        assert!(matches!(
            "MD5-sess".parse::<DigestAlgorithm>(),
            Err(ConfigError::UnsupportedDigestAlgorithm(_))
        ));
        assert_eq!("sha-256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);

        // A client insisting on md5-sess never verifies
        let mut fields = rfc2617_fields();
        fields.insert("algorithm".to_string(), "MD5-sess".to_string());
        let creds = DigestCredentials::new("Mufasa", "GET", "testrealm@host.com", fields);
        assert!(!creds.check_password(b"Circle Of Life"));
    }

    #[test]
    fn test_opaque_round_trip() {
        let factory = DigestCredentialFactory::new(DigestAlgorithm::Md5, "local");
        let opaque = factory.generate_opaque("n0nce", "10.0.0.1", 1_000);

        assert!(factory.verify_opaque(&opaque, "n0nce", "10.0.0.1", 1_010).is_ok());

        // Wrong nonce, wrong client, expired
        assert!(factory.verify_opaque(&opaque, "other", "10.0.0.1", 1_010).is_err());
        assert!(factory.verify_opaque(&opaque, "n0nce", "10.0.0.2", 1_010).is_err());
        assert!(factory
            .verify_opaque(&opaque, "n0nce", "10.0.0.1", 1_000 + 15 * 60 + 1)
            .is_err());

        // Opaque from a different factory (different private key)
        let other = DigestCredentialFactory::new(DigestAlgorithm::Md5, "local");
        assert!(other.verify_opaque(&opaque, "n0nce", "10.0.0.1", 1_010).is_err());

        assert!(factory.verify_opaque("garbage", "n0nce", "10.0.0.1", 1_010).is_err());
    }

    #[test]
    fn test_challenge_and_decode() {
        let factory = DigestCredentialFactory::new(DigestAlgorithm::Md5, "local");
        let challenge = factory.challenge_at("127.0.0.1", 5_000);
        assert!(challenge.starts_with("Digest realm=\"local\""));
        assert!(challenge.contains("algorithm=MD5"));

        let params = parse_auth_params(challenge.trim_start_matches("Digest "));
        let nonce = params.get("nonce").unwrap();
        let opaque = params.get("opaque").unwrap();

        // Client side computation
        let algorithm = DigestAlgorithm::Md5;
        let ha1 = algorithm.hash_hex(b"admin:local:admin");
        let ha2 = algorithm.hash_hex(b"GET:/version");
        let response =
            algorithm.hash_hex(format!("{ha1}:{nonce}:00000001:deadbeef:auth:{ha2}").as_bytes());

        let header = format!(
            "username=\"admin\", realm=\"local\", nonce=\"{nonce}\", uri=\"/version\", \
             qop=auth, nc=00000001, cnonce=\"deadbeef\", response=\"{response}\", \
             opaque=\"{opaque}\""
        );

        let creds = factory.decode_at(&header, "GET", "/version", "127.0.0.1", 5_030).unwrap();
        assert_eq!(creds.username(), b"admin");
        assert!(creds.check_password(b"admin"));

        // Method is bound into the response
        let creds = factory.decode_at(&header, "POST", "/version", "127.0.0.1", 5_030).unwrap();
        assert!(!creds.check_password(b"admin"));

        let err = factory
            .decode_at("realm=\"local\"", "GET", "/version", "127.0.0.1", 5_030)
            .err().unwrap();
        assert_eq!(err.to_string(), "Invalid response, no username given.");
    }

    #[test]
    fn test_response_bound_to_uri() {
        let factory = DigestCredentialFactory::new(DigestAlgorithm::Md5, "local");
        let nonce = "n0nce";
        let opaque = factory.generate_opaque(nonce, "127.0.0.1", 5_000);
        let header = format!(
            "username=\"admin\", nonce=\"{nonce}\", uri=\"/version?verbose=1\", \
             response=\"00\", opaque=\"{opaque}\""
        );

        // Query strings are not part of the request path
        assert!(factory
            .decode_at(&header, "GET", "/version", "127.0.0.1", 5_010)
            .is_ok());

        let err = factory
            .decode_at(&header, "GET", "/admin/users", "127.0.0.1", 5_010)
            .err().unwrap();
        assert_eq!(err.to_string(), "Invalid response, uri does not match request");

        let without_uri = format!("username=\"admin\", nonce=\"{nonce}\", opaque=\"{opaque}\"");
        let err = factory
            .decode_at(&without_uri, "GET", "/version", "127.0.0.1", 5_010)
            .err().unwrap();
        assert_eq!(err.to_string(), "Invalid response, no uri given.");
    }

    #[test]
    fn test_challenge_escapes_realm() {
        let factory = DigestCredentialFactory::new(DigestAlgorithm::Md5, r#"the "lab""#);
        let challenge = factory.challenge_at("127.0.0.1", 5_000);
        assert!(challenge.starts_with(r#"Digest realm="the \"lab\"", nonce=""#));

        let params = parse_auth_params(challenge.trim_start_matches("Digest "));
        assert_eq!(params.get("realm").unwrap(), r#"the "lab""#);
    }
}
