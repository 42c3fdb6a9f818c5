//! Property-based tests for compiled values

use proptest::prelude::*;
use schema_mock::config::GenerationConfig;
use schema_mock::SchemaCompiler;
use serde_json::json;

fn seeded(seed: u64) -> SchemaCompiler {
    SchemaCompiler::new(&GenerationConfig {
        seed: Some(seed),
        ..Default::default()
    })
}

proptest! {
    /// String length stays within [minLength, maxLength]
    #[test]
    fn test_string_length_bounds(
        min in 0u64..20,
        extra in 0u64..30,
        seed in any::<u64>(),
    ) {
        let max = min + extra;
        let value = seeded(seed)
            .compile_value(&json!({"type": "string", "minLength": min, "maxLength": max}))
            .unwrap();

        let len = value.as_str().unwrap().chars().count() as u64;
        prop_assert!(len >= min && len <= max, "length {} outside [{}, {}]", len, min, max);
    }

    /// Integers respect range and multipleOf together
    #[test]
    fn test_integer_range_and_multiple(
        min in -500i64..500,
        step in 1i64..20,
        extra in 0i64..200,
        seed in any::<u64>(),
    ) {
        let max = min + step + extra;
        let value = seeded(seed)
            .compile_value(&json!({"type": "integer", "minimum": min, "maximum": max, "multipleOf": step}))
            .unwrap();

        let v = value.as_i64().unwrap();
        prop_assert!(v >= min && v <= max, "{} outside [{}, {}]", v, min, max);
        prop_assert_eq!(v % step, 0);
    }

    /// Exclusive bounds are never hit
    #[test]
    fn test_number_exclusive_bounds(
        min in -1000.0f64..1000.0,
        span in 1.0f64..500.0,
        seed in any::<u64>(),
    ) {
        let max = min + span;
        let value = seeded(seed)
            .compile_value(&json!({"type": "number", "exclusiveMinimum": min, "exclusiveMaximum": max}))
            .unwrap();

        let v = value.as_f64().unwrap();
        prop_assert!(v > min && v < max, "{} not inside ({}, {})", v, min, max);
    }

    /// Wide and extreme ranges stay finite and inside their bounds
    #[test]
    fn test_number_wide_bounds(
        min in prop_oneof![Just(-f64::MAX), -1e308f64..-1e300, -1e12f64..1e12],
        max in prop_oneof![Just(f64::MAX), 1e300f64..1e308, 1e12f64..1e15],
        seed in any::<u64>(),
    ) {
        let value = seeded(seed)
            .compile_value(&json!({"type": "number", "minimum": min, "maximum": max}))
            .unwrap();

        let v = value.as_f64().unwrap();
        prop_assert!(v.is_finite() && v >= min && v <= max, "{} outside [{}, {}]", v, min, max);
    }

    /// Integer ranges wider than i64 still produce in-range whole numbers
    #[test]
    fn test_integer_wide_bounds(
        min in prop_oneof![-1e300f64..-1e19, -1e18f64..0.0],
        max in prop_oneof![1e19f64..1e300, 0.0f64..1e18],
        seed in any::<u64>(),
    ) {
        let value = seeded(seed)
            .compile_value(&json!({"type": "integer", "minimum": min, "maximum": max}))
            .unwrap();

        let v = value.as_i64().unwrap() as f64;
        prop_assert!(v >= min && v <= max, "{} outside [{}, {}]", v, min, max);
    }

    /// Required properties are always present
    #[test]
    fn test_required_always_present(seed in any::<u64>()) {
        let value = seeded(seed)
            .compile_value(&json!({
                "type": "object",
                "properties": {
                    "id": {"type": "integer"},
                    "nickname": {"type": "string"}
                },
                "required": ["id"]
            }))
            .unwrap();

        prop_assert!(value["id"].is_i64());
    }

    /// Array length follows minItems/maxItems
    #[test]
    fn test_array_item_count(
        min in 0u64..8,
        extra in 0u64..8,
        seed in any::<u64>(),
    ) {
        let max = min + extra;
        let value = seeded(seed)
            .compile_value(&json!({
                "type": "array",
                "items": {"type": "boolean"},
                "minItems": min,
                "maxItems": max
            }))
            .unwrap();

        let len = value.as_array().unwrap().len() as u64;
        prop_assert!(len >= min && len <= max);
    }

    /// Self-referencing definitions always terminate
    #[test]
    fn test_recursive_schema_terminates(seed in any::<u64>()) {
        let value = seeded(seed)
            .compile_value(&json!({
                "$ref": "#/definitions/Node",
                "definitions": {
                    "Node": {
                        "type": "object",
                        "properties": {
                            "value": {"type": "integer"},
                            "next": {"$ref": "#/definitions/Node"}
                        },
                        "required": ["value", "next"]
                    }
                }
            }))
            .unwrap();

        prop_assert!(value.is_object());
        prop_assert!(value["value"].is_i64());
    }
}

#[test]
fn test_optional_property_sometimes_absent() {
    let compiler = seeded(11);
    let schema = json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "nickname": {"type": "string"}
        },
        "required": ["id"]
    });

    let present = (0..50)
        .filter(|_| compiler.compile_value(&schema).unwrap().get("nickname").is_some())
        .count();
    assert!(present > 0 && present < 50, "nickname present {} of 50 times", present);
}
