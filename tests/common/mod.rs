//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rest_server::auth::{AccessConfig, CredentialChecker, InMemoryChecker};
use rest_server::config::ServerConfig;
use rest_server::{ApiResource, RestServer};
use serde_json::Value;

/// Checker knowing `admin/admin` and `jblow/password123`.
#[allow(dead_code)]
pub fn test_checker() -> Arc<dyn CredentialChecker> {
    Arc::new(InMemoryChecker::from_entries([
        ("admin", "Administrator", "admin"),
        ("jblow", "Joe Blow", "password123"),
    ]))
}

/// Loopback config on an ephemeral port.
pub fn local_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.interface = "127.0.0.1".to_string();
    config.listener.port = 0;
    config
}

/// Start a server and return it with its base URL.
#[allow(dead_code)]
pub async fn start_server(
    api: Arc<ApiResource>,
    access: Arc<dyn AccessConfig>,
) -> (RestServer, String) {
    let mut server = RestServer::new(local_config(), api, access);
    let addr: SocketAddr = server.start().await.unwrap();
    (server, format!("http://{addr}"))
}

#[allow(dead_code)]
pub fn basic_auth(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
}

#[allow(dead_code)]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
