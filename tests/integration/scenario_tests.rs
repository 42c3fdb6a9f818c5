//! Scenario injection over HTTP

use std::time::{Duration, Instant};

use super::common::*;
use schema_mock::config::ScenarioConfig;
use schema_mock::{ApiDefinition, RouteDef, Scenario};
use serde_json::{json, Value};

fn ping_routes() -> ApiDefinition {
    ApiDefinition::routes_only(vec![RouteDef::new("GET", "/ping", json!({"pong": true}))])
}

#[tokio::test]
async fn test_slow_adds_minimum_delay() {
    let mut config = test_config();
    config.server.scenario = Some(Scenario::Slow);
    config.scenarios = ScenarioConfig {
        slow_delay_min_ms: 150,
        slow_delay_max_ms: 200,
        ..Default::default()
    };
    let server = TestServer::spawn_with_config(config, ping_routes()).await;

    for _ in 0..3 {
        let started = Instant::now();
        let response = server.get("/ping").await;
        assert_eq!(response.status().as_u16(), 200);
        assert!(started.elapsed() >= Duration::from_millis(150));
    }
    assert_eq!(server.server.stats().injected_delays, 3);

    server.shutdown().await;
}

#[tokio::test]
async fn test_error_heavy_fails_some_requests() {
    let mut config = test_config();
    config.server.scenario = Some(Scenario::ErrorHeavy);
    let server = TestServer::spawn_with_config(config, ping_routes()).await;

    let mut failures = 0;
    for _ in 0..100 {
        let response = server.get("/ping").await;
        let status = response.status().as_u16();
        if status >= 400 {
            failures += 1;
            let body: Value = response.json().await.unwrap();
            assert_error_envelope(&body, "ScenarioError");
            assert_eq!(body["details"]["status"], json!(status));
        }
    }
    assert!(failures >= 1);
    assert!(failures < 100);

    server.shutdown().await;
}

#[tokio::test]
async fn test_happy_path_never_injects() {
    let mut config = test_config();
    config.server.scenario = Some(Scenario::HappyPath);
    let server = TestServer::spawn_with_config(config, ping_routes()).await;

    for _ in 0..20 {
        assert_eq!(server.get("/ping").await.status().as_u16(), 200);
    }
    let stats = server.server.stats();
    assert_eq!(stats.injected_errors, 0);
    assert_eq!(stats.injected_delays, 0);

    server.shutdown().await;
}

#[tokio::test]
async fn test_delays_do_not_block_other_requests() {
    let mut definition = ping_routes();
    let mut slow = RouteDef::new("GET", "/slow", json!("late"));
    slow.delay = Some(800);
    definition.routes.push(slow);
    let server = TestServer::spawn(definition).await;

    let slow_request = server.client.get(server.url("/slow")).send();
    let fast = async {
        let started = Instant::now();
        let response = server.get("/ping").await;
        (response.status().as_u16(), started.elapsed())
    };

    let (slow_response, (fast_status, fast_elapsed)) = tokio::join!(slow_request, fast);
    assert_eq!(fast_status, 200);
    assert!(fast_elapsed < Duration::from_millis(800));
    assert_eq!(slow_response.unwrap().status().as_u16(), 200);

    server.shutdown().await;
}
