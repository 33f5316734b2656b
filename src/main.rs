//! REST server (v1)
//!
//! Serves the demo API behind the configured access method.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ access wrapper ──▶ realm ──▶ ApiResource
//!                     (axum, ids,     (challenge,               (regex routes,
//!                      timeouts)       checker)                  nested trees)
//!                                                                     │
//!     Client Response                                                 ▼
//!     ◀────────────── JSON body / 401 / 404 / 500 ◀──────────────── Leaf
//! ```

use std::path::PathBuf;

use clap::Parser;

use rest_server::api::demo_api;
use rest_server::auth::AuthMethod;
use rest_server::config::{load_config, validate_config, ServerConfig};
use rest_server::lifecycle::shutdown_signal;
use rest_server::observability::{logging, metrics};
use rest_server::{ConfigError, RestServer};

#[derive(Parser, Debug)]
#[command(name = "rest-server")]
#[command(about = "Regex-routed JSON REST server", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to bind
    #[arg(short, long)]
    interface: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Access method
    #[arg(short, long, value_enum)]
    access: Option<AccessArg>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum AccessArg {
    Open,
    Basic,
    Digest,
}

impl From<AccessArg> for AuthMethod {
    fn from(arg: AccessArg) -> Self {
        match arg {
            AccessArg::Open => AuthMethod::Open,
            AccessArg::Basic => AuthMethod::Basic,
            AccessArg::Digest => AuthMethod::Digest,
        }
    }
}

/// Load the configuration, apply command line overrides and validate the result.
fn resolve_config(cli: Cli) -> Result<ServerConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(interface) = cli.interface {
        config.listener.interface = interface;
    }
    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    if let Some(access) = cli.access {
        config.access.method = access.into();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = resolve_config(Cli::parse())?;

    logging::init_logging(&config.observability);
    tracing::info!("rest-server v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let access = config.build_access().await?;
    let api = demo_api()?;

    let mut server = RestServer::new(config, api, access);
    server.start().await?;

    shutdown_signal().await;
    server.stop().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
