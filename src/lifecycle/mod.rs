//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown_signal() resolves
//!
//! Shutdown (shutdown.rs):
//!     RestServer::stop() → Shutdown::trigger()
//!     → serve task stops accepting → in-flight requests drain → task exits
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, drain, close
//! - One broadcast channel per server run

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
