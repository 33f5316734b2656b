//! Route matching logic.
//!
//! # Responsibilities
//! - Compile route patterns at registration time
//! - Match request method (exact or `ALL` wildcard)
//! - Search the path with the route pattern and extract named captures
//!
//! # Design Decisions
//! - Patterns are searched, not anchored: `^`/`$` are up to the author
//! - The matched span is reported so callers can consume a path prefix
//! - Capture groups that did not participate are left out of the params

use std::ops::Range;

use axum::http::Method;
use regex::Regex;

use crate::error::ConfigError;
use crate::routing::handler::Handler;
use crate::routing::method::HttpMethod;
use crate::routing::request::PathParams;

/// A (method, pattern, handler) binding in the registry.
#[derive(Debug, Clone)]
pub struct Route {
    method: HttpMethod,
    pattern: Regex,
    handler: Handler,
}

impl Route {
    /// Compile `pattern` into a route. A malformed pattern is fatal.
    pub fn new(method: HttpMethod, pattern: &str, handler: Handler) -> Result<Self, ConfigError> {
        let pattern = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            method,
            pattern,
            handler,
        })
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Returns the match if this route accepts `method` and its pattern is
    /// found anywhere in `path`.
    pub fn matches(&self, method: &Method, path: &str) -> Option<MatchResult> {
        if !self.method.matches(method) {
            return None;
        }

        let captures = self.pattern.captures(path)?;
        let span = captures.get(0).map(|m| m.range()).unwrap_or(0..0);

        let mut params = PathParams::new();
        for name in self.pattern.capture_names().flatten() {
            if let Some(value) = captures.name(name) {
                params.insert(name, value.as_str());
            }
        }

        Some(MatchResult {
            handler: self.handler.clone(),
            params,
            span,
        })
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub handler: Handler,
    pub params: PathParams,
    /// Byte range of the path matched by the pattern.
    pub span: Range<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::handler::Reply;

    fn noop() -> Handler {
        Handler::new(|_, _| Ok(Reply::from("ok")))
    }

    #[test]
    fn test_method_filter() {
        let route = Route::new(HttpMethod::Get, "^/version", noop()).unwrap();

        assert!(route.matches(&Method::GET, "/version").is_some());
        assert!(route.matches(&Method::POST, "/version").is_none());

        let any = Route::new(HttpMethod::All, "^/version", noop()).unwrap();
        assert!(any.matches(&Method::PUT, "/version").is_some());
    }

    #[test]
    fn test_search_not_full_match() {
        let route = Route::new(HttpMethod::Get, "/example", noop()).unwrap();

        let m = route.matches(&Method::GET, "/api/example/abc").unwrap();
        assert_eq!(m.span, 4..12);
    }

    #[test]
    fn test_named_captures() {
        let route = Route::new(
            HttpMethod::Get,
            r"^/example/(?P<key>[^/]*)/?(?P<extra>x)?$",
            noop(),
        )
        .unwrap();

        let m = route.matches(&Method::GET, "/example/abc/").unwrap();
        assert_eq!(m.params.get("key"), Some("abc"));
        // Optional group that did not participate
        assert_eq!(m.params.get("extra"), None);
        assert_eq!(m.params.len(), 1);
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Route::new(HttpMethod::Get, "^/broken(", noop()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }
}
