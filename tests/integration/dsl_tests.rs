//! Explicit route definitions

use std::io::Write;

use super::common::*;
use schema_mock::{ApiDefinition, RouteDef};
use serde_json::{json, Value};

#[tokio::test]
async fn test_literal_route_with_status_and_headers() {
    let mut created = RouteDef::new("POST", "/sessions", json!({"token": "abc"}));
    created.status_code = Some(201);
    created.headers.insert("x-session".to_string(), "fresh".to_string());
    let server = TestServer::spawn(ApiDefinition::routes_only(vec![created])).await;

    let response = server.post("/sessions", json!({})).await;
    assert_eq!(response.status().as_u16(), 201);
    assert_eq!(response.headers()["x-session"], "fresh");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["token"], json!("abc"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_later_definition_wins() {
    let routes = vec![
        RouteDef::new("GET", "/config", json!({"version": 1})),
        RouteDef::new("GET", "/config", json!({"version": 2})),
    ];
    let server = TestServer::spawn(ApiDefinition::routes_only(routes)).await;

    for _ in 0..5 {
        let body: Value = server.get("/config").await.json().await.unwrap();
        assert_eq!(body["version"], json!(2));
    }
    assert_eq!(server.server.route_table().len(), 1);

    server.shutdown().await;
}

#[tokio::test]
async fn test_generated_route_and_params() {
    let mut stats = RouteDef::new("GET", "/teams/:team/stats", Value::Null);
    stats.schema = Some(json!({
        "type": "object",
        "properties": {"wins": {"type": "integer", "minimum": 0, "maximum": 10}},
        "required": ["wins"]
    }));
    let server = TestServer::spawn(ApiDefinition::routes_only(vec![stats])).await;

    let body: Value = server.get("/teams/red/stats?season=2024").await.json().await.unwrap();
    let wins = body["wins"].as_i64().unwrap();
    assert!((0..=10).contains(&wins));

    server.shutdown().await;
}

#[tokio::test]
async fn test_routes_file_overrides_crud() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "- path: \"/api/users/{{id}}\"\n  method: GET\n  response:\n    pinned: true\n  statusCode: 202\n"
    )
    .unwrap();

    let routes = RouteDef::load_file(file.path()).unwrap();
    let definition = ApiDefinition::from_schema(user_schema()).with_routes(routes);
    let server = TestServer::spawn(definition).await;

    let response = server.get("/api/users/9").await;
    assert_eq!(response.status().as_u16(), 202);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["pinned"], json!(true));

    // Other derived routes are untouched
    assert_eq!(server.get("/api/users").await.status().as_u16(), 200);

    server.shutdown().await;
}
