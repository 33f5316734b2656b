//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → build_checker / build_access (runtime auth objects)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::load_config;
pub use schema::{
    AccessSettings, CheckerKind, ListenerConfig, LimitsConfig, LogFormat, ObservabilityConfig,
    ServerConfig, TimeoutConfig, UserEntry,
};
pub use validation::{validate_config, ValidationError};
