//! Request view seen by the router and the access layer.
//!
//! # Responsibilities
//! - Carry method, path, headers and body of one inbound request
//! - Track the unconsumed path remainder between chained resolutions
//! - Carry the authenticated identity once the access layer attached it

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::body::Bytes;
use axum::http::{request::Parts, HeaderMap, HeaderName, HeaderValue, Method};

use crate::auth::Identity;

/// One inbound request, owned for the duration of a single dispatch.
#[derive(Debug, Clone)]
pub struct RestRequest {
    method: Method,
    path: String,
    remaining_path: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    peer: Option<SocketAddr>,
    identity: Option<Identity>,
}

impl RestRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            remaining_path: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            peer: None,
            identity: None,
        }
    }

    /// Build from the pieces axum hands the server shell.
    pub fn from_parts(parts: Parts, body: Bytes, peer: Option<SocketAddr>) -> Self {
        Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            remaining_path: None,
            headers: parts.headers,
            body,
            peer,
            identity: None,
        }
    }

    /// Add a header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The full request path, never modified by resolution.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path still to be resolved. Falls back to the full path until a route
    /// has consumed part of it.
    pub fn path_to_check(&self) -> &str {
        self.remaining_path.as_deref().unwrap_or(&self.path)
    }

    pub fn remaining_path(&self) -> Option<&str> {
        self.remaining_path.as_deref()
    }

    pub(crate) fn set_remaining_path(&mut self, remaining: String) {
        self.remaining_path = Some(remaining);
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Authenticated identity, `None` for open access.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub(crate) fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }
}

/// Named capture groups of the matched route, by group name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(BTreeMap<String, String>);

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
