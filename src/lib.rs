//! Regex-routed JSON REST server with pluggable HTTP authentication.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::ServerConfig;
pub use error::ConfigError;
pub use http::{RestServer, ServerError};
pub use lifecycle::Shutdown;
pub use routing::{ApiResource, HttpMethod, Reply};
