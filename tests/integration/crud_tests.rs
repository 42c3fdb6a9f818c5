//! CRUD routes derived from a resource schema

use super::common::*;
use schema_mock::{ApiDefinition, GENERATOR_NAME};
use serde_json::{json, Value};

#[tokio::test]
async fn test_list_items_have_required_fields() {
    let server = TestServer::spawn(ApiDefinition::from_schema(user_schema())).await;

    let response = server.get("/api/users").await;
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    let items = body["data"].as_array().unwrap();
    assert!((3..=10).contains(&items.len()));
    assert_eq!(body["count"], json!(items.len()));
    for item in items {
        assert!(item["id"].is_string());
        assert!(item["name"].is_string());
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_get_echoes_path_id() {
    let server = TestServer::spawn(ApiDefinition::from_schema(user_schema())).await;

    let body: Value = server.get("/api/users/42").await.json().await.unwrap();
    assert_eq!(body["data"]["id"], json!("42"));
    assert!(body["data"]["name"].is_string());

    let body: Value = server.get("/api/users/a%20b").await.json().await.unwrap();
    assert_eq!(body["data"]["id"], json!("a b"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_create_merges_body() {
    let server = TestServer::spawn(ApiDefinition::from_schema(user_schema())).await;

    let response = server.post("/api/users", json!({"name": "Ada"})).await;
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    let data = &body["data"];
    assert_eq!(data["name"], json!("Ada"));
    assert!(uuid::Uuid::parse_str(data["id"].as_str().unwrap()).is_ok());
    assert!(data["createdAt"].is_string());
    assert_eq!(data["createdAt"], data["updatedAt"]);

    server.shutdown().await;
}

#[tokio::test]
async fn test_replace_keeps_path_id() {
    let server = TestServer::spawn(ApiDefinition::from_schema(user_schema())).await;

    let response = server.put("/api/users/7", json!({"name": "Grace"})).await;
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["id"], json!("7"));
    assert_eq!(body["data"]["name"], json!("Grace"));
    assert!(body["data"]["updatedAt"].is_string());

    server.shutdown().await;
}

#[tokio::test]
async fn test_delete_is_no_content() {
    let server = TestServer::spawn(ApiDefinition::from_schema(user_schema())).await;

    let response = server.delete("/api/users/7").await;
    assert_eq!(response.status().as_u16(), 204);
    assert!(response.bytes().await.unwrap().is_empty());

    server.shutdown().await;
}

#[tokio::test]
async fn test_irregular_and_suffix_plurals() {
    let person = json!({"type": "object", "title": "Person", "properties": {"name": {"type": "string"}}});
    let server = TestServer::spawn(ApiDefinition::from_schema(person)).await;
    assert_eq!(server.get("/api/people").await.status().as_u16(), 200);
    server.shutdown().await;

    let category = json!({"type": "object", "title": "Category", "properties": {"label": {"type": "string"}}});
    let server = TestServer::spawn(ApiDefinition::from_schema(category)).await;
    assert_eq!(server.get("/api/categories").await.status().as_u16(), 200);
    assert_eq!(server.get("/api/categorys").await.status().as_u16(), 404);
    server.shutdown().await;
}

#[tokio::test]
async fn test_branding_and_health() {
    let server = TestServer::spawn(ApiDefinition::from_schema(user_schema())).await;

    let response = server.get("/api/users/1").await;
    assert_eq!(response.headers()["x-powered-by"], GENERATOR_NAME);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["_meta"]["generator"], json!(GENERATOR_NAME));

    let health: Value = server.get("/health").await.json().await.unwrap();
    assert_eq!(health["status"], json!("ok"));
    assert!(health["timestamp"].is_string());

    server.shutdown().await;
}

#[tokio::test]
async fn test_unknown_route_envelope() {
    let server = TestServer::spawn(ApiDefinition::from_schema(user_schema())).await;

    let response = server.get("/api/orders").await;
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_error_envelope(&body, "NotFound");

    server.shutdown().await;
}
