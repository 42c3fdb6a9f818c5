//! Strict-mode request validation over HTTP

use super::common::*;
use schema_mock::{ApiDefinition, RouteDef};
use serde_json::{json, Value};

fn strict_config() -> schema_mock::MockServerConfig {
    let mut config = test_config();
    config.server.strict_mode = true;
    config
}

fn order_schema() -> Value {
    json!({
        "type": "object",
        "title": "Order",
        "properties": {
            "id": {"type": "integer"},
            "sku": {"type": "string", "minLength": 3},
            "quantity": {"type": "integer", "minimum": 1, "maximum": 99},
            "address": {
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"]
            }
        },
        "required": ["id", "sku", "quantity"]
    })
}

#[tokio::test]
async fn test_missing_required_field_is_400() {
    let server = TestServer::spawn_with_config(strict_config(), ApiDefinition::from_schema(order_schema())).await;

    let response = server.post("/api/orders", json!({"sku": "ABC"})).await;
    assert_eq!(response.status().as_u16(), 400);

    let body: Value = response.json().await.unwrap();
    assert_error_envelope(&body, "ValidationError");
    assert_eq!(body["details"]["field"], json!("quantity"));
    assert_eq!(server.server.stats().validation_rejections, 1);

    server.shutdown().await;
}

#[tokio::test]
async fn test_conforming_body_succeeds() {
    let server = TestServer::spawn_with_config(strict_config(), ApiDefinition::from_schema(order_schema())).await;

    let response = server.post("/api/orders", json!({"sku": "ABC", "quantity": 2})).await;
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert!(body["data"]["id"].is_u64());

    let response = server.put("/api/orders/5", json!({"sku": "XYZ", "quantity": 9})).await;
    assert_eq!(response.status().as_u16(), 200);

    server.shutdown().await;
}

#[tokio::test]
async fn test_constraint_and_nested_failures() {
    let server = TestServer::spawn_with_config(strict_config(), ApiDefinition::from_schema(order_schema())).await;

    let body: Value = server
        .post("/api/orders", json!({"sku": "AB", "quantity": 2}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["details"]["field"], json!("sku"));
    assert_eq!(body["details"]["expected"], json!("minLength 3"));
    assert_eq!(body["details"]["actual"], json!("AB"));

    let body: Value = server
        .post("/api/orders", json!({"sku": "ABC", "quantity": 100}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["details"]["expected"], json!("maximum 99"));

    let body: Value = server
        .post("/api/orders", json!({"sku": "ABC", "quantity": 1, "address": {}}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["details"]["field"], json!("address.city"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_lenient_mode_accepts_anything() {
    let server = TestServer::spawn(ApiDefinition::from_schema(order_schema())).await;

    let response = server.post("/api/orders", json!({"sku": 1})).await;
    assert_eq!(response.status().as_u16(), 201);

    server.shutdown().await;
}

#[tokio::test]
async fn test_route_without_schema_skips_validation() {
    let definition = ApiDefinition::routes_only(vec![RouteDef::new("POST", "/echo", json!({"ok": true}))]);
    let server = TestServer::spawn_with_config(strict_config(), definition).await;

    let response = server.post("/echo", json!("anything")).await;
    assert_eq!(response.status().as_u16(), 200);

    server.shutdown().await;
}
