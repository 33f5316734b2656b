//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level at startup
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` takes precedence over the configured level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Directive used when neither `RUST_LOG` nor the config parses.
const FALLBACK_FILTER: &str = "rest_server=info,tower_http=info";

/// Build the filter for `config`, preferring the environment.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(format!(
                "rest_server={level},tower_http={level}",
                level = config.log_level
            ))
        })
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER))
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init_logging(config: &ObservabilityConfig) {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    let result = match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };

    if result.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}
