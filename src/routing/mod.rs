//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (method, path)
//!     → router.rs (ordered scan of the registry)
//!     → matcher.rs (method filter + regex search, named captures)
//!     → handler.rs (invoke, coerce Reply into Leaf)
//!     → nested ApiResource? continue with the unconsumed path
//!     → Return: Leaf or NotFound
//!
//! Route registration (at startup):
//!     ApiResource::builder().get(..).post(..)
//!     → compile patterns (fail fast)
//!     → freeze behind Arc while serving
//! ```
//!
//! # Design Decisions
//! - First match wins (registration order)
//! - Patterns are searched, so a route may claim just a path prefix
//! - Deterministic: same input always matches same route

pub mod handler;
pub mod matcher;
pub mod method;
pub mod request;
pub mod resource;
pub mod router;

pub use handler::{Handler, Leaf, Reply};
pub use matcher::{MatchResult, Route};
pub use method::HttpMethod;
pub use request::{PathParams, RestRequest};
pub use resource::Resource;
pub use router::{ApiResource, ApiResourceBuilder, RouteError};
