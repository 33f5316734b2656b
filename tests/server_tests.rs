//! Server lifecycle over real sockets.

mod common;

use std::sync::Arc;

use rest_server::auth::{build_access_config, AccessOptions, AuthMethod, OpenAccessConfig};
use rest_server::http::default_api;
use rest_server::{RestServer, ServerError};
use serde_json::{json, Value};

use common::{basic_auth, local_config, start_server, test_checker};

#[tokio::test]
async fn test_hello_world_over_http() {
    let (mut server, base) = start_server(default_api().unwrap(), Arc::new(OpenAccessConfig::new())).await;

    let res = reqwest::get(format!("{base}/any/path/at/all")).await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.json::<Value>().await.unwrap(), json!("Hello world"));

    server.stop().await.unwrap();
    assert!(reqwest::get(format!("{base}/")).await.is_err());
}

#[tokio::test]
async fn test_request_id_is_preserved() {
    let (mut server, base) = start_server(default_api().unwrap(), Arc::new(OpenAccessConfig::new())).await;

    let res = reqwest::Client::new()
        .get(format!("{base}/"))
        .header("x-request-id", "trace-me-42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers().get("x-request-id").unwrap(), "trace-me-42");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_basic_auth_over_http() {
    let access =
        build_access_config(AuthMethod::Basic, Some(test_checker()), &AccessOptions::default())
            .unwrap();
    let (mut server, base) = start_server(default_api().unwrap(), access).await;
    assert_eq!(server.access_method(), AuthMethod::Basic);

    let client = reqwest::Client::new();
    let res = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::UNAUTHORIZED);

    let res = client
        .get(format!("{base}/"))
        .header("authorization", basic_auth("admin", "admin"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_restart_after_stop() {
    let mut server = RestServer::new(
        local_config(),
        default_api().unwrap(),
        Arc::new(OpenAccessConfig::new()),
    );

    server.start().await.unwrap();
    assert!(matches!(server.set_api(default_api().unwrap()), Err(ServerError::Running)));
    server.stop().await.unwrap();

    server.set_api(default_api().unwrap()).unwrap();
    let addr = server.start().await.unwrap();
    let res = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_bind_failure() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = local_config();
    config.listener.port = occupied.local_addr().unwrap().port();

    let mut server = RestServer::new(config, default_api().unwrap(), Arc::new(OpenAccessConfig::new()));
    assert!(matches!(server.start().await, Err(ServerError::Bind { .. })));
    assert!(!server.is_running());
}
