//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Create the Axum Router that hands every request to the resource tree
//! - Wire up middleware (timeout, request ID, tracing)
//! - Secure the API with the access configuration at start
//! - Bind, serve in the background, shut down gracefully
//!
//! # Design Decisions
//! - The API is frozen while serving; `set_api` is refused until `stop`
//! - `start` and `stop` are idempotent
//! - Handler faults are logged and answered with a generic 500

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::{AccessConfig, AuthMethod};
use crate::config::ServerConfig;
use crate::error::ConfigError;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::{internal_error, json_error};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::routing::{ApiResource, Reply, Resource, RestRequest};

/// Server lifecycle failures.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server is running")]
    Running,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serve task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Application state injected into the request handler.
#[derive(Clone)]
struct AppState {
    resource: Arc<dyn Resource>,
    max_body_size: usize,
}

struct Running {
    shutdown: Shutdown,
    handle: JoinHandle<Result<(), std::io::Error>>,
    local_addr: SocketAddr,
}

/// REST server: one resource tree behind one access configuration.
pub struct RestServer {
    config: ServerConfig,
    api: Arc<ApiResource>,
    access: Arc<dyn AccessConfig>,
    running: Option<Running>,
}

impl RestServer {
    pub fn new(config: ServerConfig, api: Arc<ApiResource>, access: Arc<dyn AccessConfig>) -> Self {
        Self {
            config,
            api,
            access,
            running: None,
        }
    }

    pub fn interface(&self) -> &str {
        &self.config.listener.interface
    }

    /// Configured port; see `local_addr` for the bound one.
    pub fn port(&self) -> u16 {
        self.config.listener.port
    }

    pub fn access_method(&self) -> AuthMethod {
        self.access.method()
    }

    pub fn api(&self) -> &Arc<ApiResource> {
        &self.api
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Replace the served API. Refused while running.
    pub fn set_api(&mut self, api: Arc<ApiResource>) -> Result<(), ServerError> {
        if self.is_running() {
            return Err(ServerError::Running);
        }
        self.api = api;
        Ok(())
    }

    /// Secure the API, bind and start serving in the background.
    ///
    /// Returns the bound address. Calling it on a running server does nothing.
    pub async fn start(&mut self) -> Result<SocketAddr, ServerError> {
        if let Some(running) = &self.running {
            tracing::debug!(address = %running.local_addr, "Server already running");
            return Ok(running.local_addr);
        }

        let api: Arc<dyn Resource> = self.api.clone();
        let resource = self.access.secure_resource(api)?;

        let address = format!("{}:{}", self.interface(), self.port());
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let app = build_router(resource, &self.config)
            .into_make_service_with_connect_info::<SocketAddr>();

        let shutdown = Shutdown::new();
        let signal = shutdown.wait();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(signal)
                .await
        });

        tracing::info!(
            address = %local_addr,
            access = %self.access.method(),
            realm = %self.access.realm_name(),
            routes = self.api.len(),
            "HTTP server started"
        );

        self.running = Some(Running {
            shutdown,
            handle,
            local_addr,
        });
        Ok(local_addr)
    }

    /// Stop accepting, drain in-flight requests and wait for the serve task.
    pub async fn stop(&mut self) -> Result<(), ServerError> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        running.shutdown.trigger();
        running.handle.await??;

        tracing::info!(address = %running.local_addr, "HTTP server stopped");
        Ok(())
    }
}

impl Drop for RestServer {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.shutdown.trigger();
        }
    }
}

/// API answering "Hello world" to every request.
pub fn default_api() -> Result<Arc<ApiResource>, ConfigError> {
    ApiResource::builder()
        .all("^/.*$", |_, _| Ok(Reply::from("Hello world")))
        .build_shared()
}

/// Build the Axum router serving `resource` with all middleware layers.
#[allow(deprecated)]
pub fn build_router(resource: Arc<dyn Resource>, config: &ServerConfig) -> Router {
    let state = AppState {
        resource,
        max_body_size: config.limits.max_body_size,
    };

    Router::new()
        .route("/", any(serve_request))
        .route("/{*path}", any(serve_request))
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(set_request_id_layer())
}

/// Hand one request to the resource tree.
async fn serve_request(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request).to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (parts, body) = request.into_parts();
    let method = parts.method.clone();

    let response = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(body) => {
            let request = RestRequest::from_parts(parts, body, peer);
            tracing::debug!(
                request_id = %request_id,
                method = %method,
                path = %request.path(),
                "Dispatching request"
            );

            match state.resource.render(request).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(request_id = %request_id, error = %e, "Request failed");
                    internal_error()
                }
            }
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Rejected request body");
            json_error(
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                "Request body too large",
            )
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::OpenAccessConfig;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.listener.interface = "127.0.0.1".into();
        config.listener.port = 0;
        config
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_default_api_answers_everything() {
        let app = build_router(default_api().unwrap(), &test_config());

        for uri in ["/", "/foo", "/a/b/c?x=1"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().contains_key("x-request-id"));
            assert_eq!(body_json(response).await, json!("Hello world"));
        }
    }

    #[tokio::test]
    async fn test_handler_error_is_500() {
        let api = ApiResource::builder()
            .get("^/boom$", |_, _| Err(anyhow::anyhow!("kaboom")))
            .build_shared()
            .unwrap();
        let app = build_router(api, &test_config());

        let response = app
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"]["code"], "internal_error");
    }

    #[tokio::test]
    async fn test_body_limit() {
        let mut config = test_config();
        config.limits.max_body_size = 8;
        let app = build_router(default_api().unwrap(), &config);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .body(Body::from("0123456789"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let mut server = RestServer::new(
            test_config(),
            default_api().unwrap(),
            Arc::new(OpenAccessConfig::new()),
        );
        assert!(!server.is_running());
        assert_eq!(server.access_method(), AuthMethod::Open);

        // Stopping a stopped server is fine
        server.stop().await.unwrap();

        let addr = server.start().await.unwrap();
        assert!(server.is_running());
        assert_eq!(server.start().await.unwrap(), addr);

        assert!(matches!(
            server.set_api(default_api().unwrap()),
            Err(ServerError::Running)
        ));

        server.stop().await.unwrap();
        server.stop().await.unwrap();
        assert!(!server.is_running());
        assert!(server.local_addr().is_none());

        server.set_api(Arc::new(ApiResource::new())).unwrap();
        assert!(server.api().is_empty());
    }

    #[tokio::test]
    async fn test_unimplemented_access_fails_start() {
        let access = crate::auth::build_access_config(
            AuthMethod::WebToken,
            None,
            &Default::default(),
        )
        .unwrap();
        let mut server = RestServer::new(test_config(), default_api().unwrap(), access);

        assert!(matches!(
            server.start().await,
            Err(ServerError::Config(ConfigError::NotImplemented(AuthMethod::WebToken)))
        ));
        assert!(!server.is_running());
    }
}
