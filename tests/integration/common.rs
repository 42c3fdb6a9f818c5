//! Common test utilities for integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};

use schema_mock::{ApiDefinition, MockServer, MockServerConfig};

/// A port nothing is listening on right now
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Loopback configuration on a free port with a fixed seed
pub fn test_config() -> MockServerConfig {
    MockServerConfig::for_testing(free_port())
}

pub fn user_schema() -> Value {
    json!({
        "type": "object",
        "title": "User",
        "properties": {
            "id": {"type": "string", "format": "uuid"},
            "name": {"type": "string"}
        },
        "required": ["id", "name"]
    })
}

/// Running session plus an HTTP client pointed at it
pub struct TestServer {
    pub server: MockServer,
    pub addr: SocketAddr,
    pub client: Client,
    pub base_url: String,
}

impl TestServer {
    pub async fn spawn(definition: ApiDefinition) -> Self {
        Self::spawn_with_config(test_config(), definition).await
    }

    pub async fn spawn_with_config(config: MockServerConfig, definition: ApiDefinition) -> Self {
        let mut server = MockServer::new(config, definition).unwrap();
        let addr = server.start().await.unwrap();

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap();

        Self {
            server,
            addr,
            client,
            base_url: format!("http://{}", addr),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client.post(self.url(path)).json(&body).send().await.unwrap()
    }

    pub async fn put(&self, path: &str, body: Value) -> reqwest::Response {
        self.client.put(self.url(path)).json(&body).send().await.unwrap()
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client.delete(self.url(path)).send().await.unwrap()
    }

    pub async fn shutdown(mut self) {
        self.server.stop().await.unwrap();
    }
}

/// Assert the standard error envelope with the given kind
pub fn assert_error_envelope(body: &Value, kind: &str) {
    assert_eq!(body["success"], json!(false), "body: {}", body);
    assert_eq!(body["error"], json!(kind), "body: {}", body);
    assert!(body["message"].is_string(), "body: {}", body);
}
