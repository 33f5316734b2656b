//! HTTP method selectors for route registration.

use std::fmt;
use std::str::FromStr;

use axum::http::Method;

/// Method a route answers to. `All` matches every request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    All,
}

impl HttpMethod {
    /// Returns true if a request with `method` is eligible for this route.
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            HttpMethod::All => true,
            HttpMethod::Get => method == Method::GET,
            HttpMethod::Post => method == Method::POST,
            HttpMethod::Put => method == Method::PUT,
            HttpMethod::Delete => method == Method::DELETE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::All => "ALL",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown method name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown HTTP method '{0}'")]
pub struct UnknownMethod(pub String);

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "ALL" => Ok(HttpMethod::All),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}
