//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware layers)
//!     → request.rs (request ID assigned and echoed)
//!     → access-wrapped resource (auth, then routing)
//!     → response.rs (leaf or error → JSON response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{build_router, default_api, RestServer, ServerError};
