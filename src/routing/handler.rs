//! Route handlers and their return values.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::routing::request::{PathParams, RestRequest};
use crate::routing::router::ApiResource;

type HandlerFn = dyn Fn(&RestRequest, &PathParams) -> anyhow::Result<Reply> + Send + Sync;

/// Shared route callback.
///
/// Cloning shares the callback; two handlers compare equal only when they
/// are clones of the same registration.
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&RestRequest, &PathParams) -> anyhow::Result<Reply> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, request: &RestRequest, params: &PathParams) -> anyhow::Result<Reply> {
        (self.0)(request, params)
    }

    pub fn ptr_eq(&self, other: &Handler) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:p})", Arc::as_ptr(&self.0))
    }
}

/// What a handler hands back to the dispatcher.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Plain data, rendered verbatim as the response body.
    Value(Value),
    /// Explicit not-found signal with a diagnostic message.
    NotFound(String),
    /// Nested resource that continues resolving the unconsumed path.
    Resource(Arc<ApiResource>),
}

impl Reply {
    /// Serialize any value into a `Reply::Value`.
    pub fn json<T: Serialize>(value: &T) -> anyhow::Result<Self> {
        Ok(Reply::Value(serde_json::to_value(value)?))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Reply::NotFound(message.into())
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Value(value)
    }
}

impl From<&str> for Reply {
    fn from(value: &str) -> Self {
        Reply::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Reply {
    fn from(value: String) -> Self {
        Reply::Value(Value::String(value))
    }
}

impl From<ApiResource> for Reply {
    fn from(resource: ApiResource) -> Self {
        Reply::Resource(Arc::new(resource))
    }
}

impl From<Arc<ApiResource>> for Reply {
    fn from(resource: Arc<ApiResource>) -> Self {
        Reply::Resource(resource)
    }
}

/// Terminal node of a resolution: emits its content with no further
/// path resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Body(Value),
    NotFound(String),
}
