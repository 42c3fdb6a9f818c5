//! Session lifecycle: start, stop, restart, reload

use std::time::Duration;

use super::common::*;
use schema_mock::{ApiDefinition, MockError, MockServer, Phase, RouteDef};
use serde_json::json;

fn ping_routes() -> ApiDefinition {
    ApiDefinition::routes_only(vec![RouteDef::new("GET", "/ping", json!({"pong": true}))])
}

#[tokio::test]
async fn test_start_and_stop() {
    let config = test_config();
    let port = config.server.port;
    let mut server = MockServer::new(config, ping_routes()).unwrap();
    assert_eq!(server.phase(), Phase::Stopped);

    let addr = server.start().await.unwrap();
    assert_eq!(addr.port(), port);
    assert!(server.is_running());
    assert_eq!(server.local_addr(), Some(addr));

    let response = reqwest::get(format!("http://{}/ping", addr)).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    server.stop().await.unwrap();
    assert_eq!(server.phase(), Phase::Stopped);
    assert!(!server.is_running());
    assert!(server.local_addr().is_none());

    // Listener is released
    assert!(std::net::TcpListener::bind(addr).is_ok());
}

#[tokio::test]
async fn test_port_in_use() {
    let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = blocker.local_addr().unwrap().port();

    let mut server = MockServer::new(schema_mock::MockServerConfig::for_testing(port), ping_routes()).unwrap();
    let err = server.start().await.unwrap_err();
    assert!(matches!(err, MockError::PortInUse { port: p } if p == port));
    assert_eq!(server.phase(), Phase::Stopped);
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let mut server = MockServer::new(test_config(), ping_routes()).unwrap();
    server.stop().await.unwrap();

    server.start().await.unwrap();
    server.stop().await.unwrap();
    server.stop().await.unwrap();
    assert_eq!(server.phase(), Phase::Stopped);
}

#[tokio::test]
async fn test_start_twice_keeps_listener() {
    let mut server = MockServer::new(test_config(), ping_routes()).unwrap();
    let first = server.start().await.unwrap();
    let second = server.start().await.unwrap();
    assert_eq!(first, second);
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_restart_with_new_config() {
    let mut server = MockServer::new(test_config(), ping_routes()).unwrap();
    let first = server.start().await.unwrap();

    let mut config = test_config();
    config.server.hide_branding = true;
    let second = server.restart(Some(config.clone())).await.unwrap();

    assert_eq!(second.port(), config.server.port);
    assert_ne!(first, second);
    assert!(server.config().server.hide_branding);

    let response = reqwest::get(format!("http://{}/ping", second)).await.unwrap();
    assert!(response.headers().get("x-powered-by").is_none());

    let restarted = server.restart(None).await.unwrap();
    assert_eq!(restarted, second);
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_restart_rejects_invalid_config() {
    let mut server = MockServer::new(test_config(), ping_routes()).unwrap();
    server.start().await.unwrap();

    let mut bad = test_config();
    bad.server.port = 0;
    assert!(matches!(server.restart(Some(bad)).await, Err(MockError::Config { .. })));
    assert!(server.is_running());
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_drains_in_flight_request() {
    let mut slow = RouteDef::new("GET", "/slow", json!({"done": true}));
    slow.delay = Some(300);
    let server = TestServer::spawn(ApiDefinition::routes_only(vec![slow])).await;
    let url = server.url("/slow");
    let client = server.client.clone();

    let in_flight = tokio::spawn(async move { client.get(url).send().await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    server.shutdown().await;

    let response = in_flight.await.unwrap().unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn test_reload_while_running() {
    let mut server = TestServer::spawn(ping_routes()).await;
    assert_eq!(server.get("/ping").await.status().as_u16(), 200);

    server
        .server
        .reload(ApiDefinition::from_schema(user_schema()))
        .unwrap();
    assert_eq!(server.get("/ping").await.status().as_u16(), 404);
    assert_eq!(server.get("/api/users").await.status().as_u16(), 200);

    server.shutdown().await;
}
