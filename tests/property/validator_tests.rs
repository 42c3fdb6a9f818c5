//! Compiled values validate against the schema they came from

use proptest::prelude::*;
use schema_mock::config::GenerationConfig;
use schema_mock::{RequestValidator, SchemaCompiler, SchemaDocument};
use serde_json::{json, Value};

fn roundtrip(schema: Value, seed: u64) -> Result<(), String> {
    let compiler = SchemaCompiler::new(&GenerationConfig {
        seed: Some(seed),
        ..Default::default()
    });
    let document = SchemaDocument::from_value(schema).map_err(|e| e.to_string())?;
    let value = compiler.compile(&document).map_err(|e| e.to_string())?;
    RequestValidator::new(&document)
        .validate(Some(&value))
        .map_err(|f| format!("{} for {}", f, value))
}

proptest! {
    #[test]
    fn test_constrained_object_validates(
        min_len in 0u64..10,
        min in -100i64..100,
        step in 1i64..10,
        seed in any::<u64>(),
    ) {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "minLength": min_len, "maxLength": min_len + 5},
                "score": {"type": "integer", "minimum": min, "maximum": min + 50, "multipleOf": step},
                "tags": {"type": "array", "items": {"type": "string"}, "maxItems": 4},
                "status": {"enum": ["active", "archived"]}
            },
            "required": ["name", "score", "status"]
        });
        let result = roundtrip(schema, seed);
        prop_assert!(result.is_ok(), "{:?}", result);
    }

    #[test]
    fn test_pattern_with_length_validates(
        min in 4u64..20,
        extra in 0u64..10,
        pattern in prop::sample::select(vec!["^[a-z0-9]+$", "^id-[0-9]+$", r"^\w*$"]),
        seed in any::<u64>(),
    ) {
        let schema = json!({
            "type": "string",
            "pattern": pattern,
            "minLength": min,
            "maxLength": min + extra
        });
        let result = roundtrip(schema, seed);
        prop_assert!(result.is_ok(), "{:?}", result);
    }

    #[test]
    fn test_format_with_length_validates(
        format in prop::sample::select(vec!["email", "hostname", "password"]),
        min in 0u64..8,
        extra in 0u64..24,
        seed in any::<u64>(),
    ) {
        // Five characters is the shortest valid email
        let max = (min + extra).max(5);
        let schema = json!({"type": "string", "format": format, "minLength": min, "maxLength": max});
        let result = roundtrip(schema, seed);
        prop_assert!(result.is_ok(), "{:?}", result);
    }

    #[test]
    fn test_formats_validate(
        format in prop::sample::select(vec!["uuid", "email", "date-time", "date", "ipv4", "ipv6"]),
        seed in any::<u64>(),
    ) {
        let result = roundtrip(json!({"type": "string", "format": format}), seed);
        prop_assert!(result.is_ok(), "{:?}", result);
    }
}

#[test]
fn test_tokio_runtime_engine_roundtrip() {
    use schema_mock::routes::{HttpMethod, MockRequest};
    use schema_mock::{ApiDefinition, MockServer, MockServerConfig};

    let schema = json!({
        "type": "object",
        "title": "Book",
        "properties": {"isbn": {"type": "string", "minLength": 10, "maxLength": 13}},
        "required": ["isbn"]
    });
    let server = MockServer::new(MockServerConfig::for_testing(3000), ApiDefinition::from_schema(schema)).unwrap();
    let engine = server.engine();

    let response = tokio_test::block_on(engine.handle(MockRequest::new(HttpMethod::Get, "/api/books/1")));
    assert_eq!(response.status, 200);
    let isbn = response.body.unwrap()["data"]["isbn"].as_str().unwrap().len();
    assert!((10..=13).contains(&isbn));
}
