//! Route registry and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Look up the first route matching method and path
//! - Invoke the handler and coerce its reply into a leaf
//! - Recurse into nested resources with the unconsumed path
//!
//! # Design Decisions
//! - Immutable while serving (shared via Arc, mutation needs `&mut`)
//! - O(n) ordered scan; first match wins, ties broken by insertion order
//! - Explicit NotFound rather than silent default
//! - Handler errors are not caught here

use std::sync::Arc;

use crate::error::ConfigError;
use crate::routing::handler::{Handler, Leaf, Reply};
use crate::routing::matcher::{MatchResult, Route};
use crate::routing::method::HttpMethod;
use crate::routing::request::{PathParams, RestRequest};

/// Request-time routing failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// No route matched; carries the path that failed to resolve.
    #[error("Resource '{path}' not found")]
    NotFound { path: String },
}

/// Regex-routed resource: an ordered list of routes.
#[derive(Debug, Clone, Default)]
pub struct ApiResource {
    routes: Vec<Route>,
}

impl ApiResource {
    /// Create an empty resource.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ApiResourceBuilder {
        ApiResourceBuilder::default()
    }

    /// Compile `pattern` and append the route.
    ///
    /// Duplicate and overlapping patterns are allowed.
    pub fn register(
        &mut self,
        method: HttpMethod,
        pattern: &str,
        handler: Handler,
    ) -> Result<(), ConfigError> {
        let route = Route::new(method, pattern, handler)?;
        tracing::debug!(method = %method, pattern = %pattern, "Route registered");
        self.routes.push(route);
        Ok(())
    }

    /// Remove every route matching all given filters and return how many
    /// were removed. Without any filter nothing is removed.
    ///
    /// Patterns compare by source text, handlers by identity.
    pub fn unregister(
        &mut self,
        method: Option<HttpMethod>,
        pattern: Option<&str>,
        handler: Option<&Handler>,
    ) -> usize {
        if method.is_none() && pattern.is_none() && handler.is_none() {
            return 0;
        }

        let before = self.routes.len();
        self.routes.retain(|route| {
            let selected = method.map_or(true, |m| route.method() == m)
                && pattern.map_or(true, |p| route.pattern().as_str() == p)
                && handler.map_or(true, |h| route.handler().ptr_eq(h));
            !selected
        });

        let removed = before - self.routes.len();
        if removed > 0 {
            tracing::debug!(removed, "Routes unregistered");
        }
        removed
    }

    /// Find the first route matching the request.
    ///
    /// On success the request's unconsumed path becomes everything after the
    /// matched span.
    pub fn resolve(&self, request: &mut RestRequest) -> Result<MatchResult, RouteError> {
        let path = request.path_to_check().to_string();

        let matched = self
            .routes
            .iter()
            .find_map(|route| route.matches(request.method(), &path));

        match matched {
            Some(result) => {
                request.set_remaining_path(path[result.span.end..].to_string());
                Ok(result)
            }
            None => Err(RouteError::NotFound { path }),
        }
    }

    /// Resolve the request, run the handler and reduce its reply to a leaf.
    pub fn dispatch(&self, request: &mut RestRequest) -> anyhow::Result<Leaf> {
        let matched = match self.resolve(request) {
            Ok(matched) => matched,
            Err(err) => {
                tracing::debug!(method = %request.method(), error = %err, "No route matched");
                return Ok(Leaf::NotFound(err.to_string()));
            }
        };

        match matched.handler.call(request, &matched.params)? {
            Reply::Value(value) => Ok(Leaf::Body(value)),
            Reply::NotFound(message) => Ok(Leaf::NotFound(message)),
            Reply::Resource(child) => child.dispatch(request),
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Explicit route table construction.
///
/// Routes are registered in the order they are declared; the first pattern
/// error aborts `build`.
#[derive(Default)]
pub struct ApiResourceBuilder {
    routes: Vec<(HttpMethod, String, Handler)>,
}

impl ApiResourceBuilder {
    pub fn route(mut self, method: HttpMethod, pattern: impl Into<String>, handler: Handler) -> Self {
        self.routes.push((method, pattern.into(), handler));
        self
    }

    pub fn get<F>(self, pattern: impl Into<String>, f: F) -> Self
    where
        F: Fn(&RestRequest, &PathParams) -> anyhow::Result<Reply> + Send + Sync + 'static,
    {
        self.route(HttpMethod::Get, pattern, Handler::new(f))
    }

    pub fn post<F>(self, pattern: impl Into<String>, f: F) -> Self
    where
        F: Fn(&RestRequest, &PathParams) -> anyhow::Result<Reply> + Send + Sync + 'static,
    {
        self.route(HttpMethod::Post, pattern, Handler::new(f))
    }

    pub fn put<F>(self, pattern: impl Into<String>, f: F) -> Self
    where
        F: Fn(&RestRequest, &PathParams) -> anyhow::Result<Reply> + Send + Sync + 'static,
    {
        self.route(HttpMethod::Put, pattern, Handler::new(f))
    }

    pub fn delete<F>(self, pattern: impl Into<String>, f: F) -> Self
    where
        F: Fn(&RestRequest, &PathParams) -> anyhow::Result<Reply> + Send + Sync + 'static,
    {
        self.route(HttpMethod::Delete, pattern, Handler::new(f))
    }

    pub fn all<F>(self, pattern: impl Into<String>, f: F) -> Self
    where
        F: Fn(&RestRequest, &PathParams) -> anyhow::Result<Reply> + Send + Sync + 'static,
    {
        self.route(HttpMethod::All, pattern, Handler::new(f))
    }

    pub fn build(self) -> Result<ApiResource, ConfigError> {
        let mut resource = ApiResource::new();
        for (method, pattern, handler) in self.routes {
            resource.register(method, &pattern, handler)?;
        }
        Ok(resource)
    }

    /// Build and wrap for sharing.
    pub fn build_shared(self) -> Result<Arc<ApiResource>, ConfigError> {
        self.build().map(Arc::new)
    }
}
