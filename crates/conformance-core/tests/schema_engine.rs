// crates/conformance-core/tests/schema_engine.rs
// ============================================================================
// Module: Schema Engine Tests
// Description: Verifies defect paths, messages, and short-circuit behavior.
// ============================================================================
//! ## Overview
//! Exercises the schema interpreter against small hand-written documents that
//! mirror the shapes used by protocol catalogs.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use conformance_core::DefectKind;
use conformance_core::SchemaDescriptor;
use conformance_core::SchemaLoadError;
use conformance_core::schema::ROOT_PATH;
use conformance_core::schema::validate;
use serde_json::Value;
use serde_json::json;

fn compile(document: &Value) -> SchemaDescriptor {
    SchemaDescriptor::compile(document).unwrap()
}

fn paths(descriptor: &SchemaDescriptor, value: &Value) -> Vec<(String, String)> {
    validate(descriptor, value).into_iter().map(|err| (err.path, err.message)).collect()
}

fn context_schema() -> SchemaDescriptor {
    compile(&json!({
        "type": "object",
        "properties": {
            "context": {
                "type": "object",
                "properties": {
                    "action": {"type": "string", "const": "search"},
                    "city": {
                        "type": "string",
                        "not": {"pattern": "\\*"},
                        "errorMessage": "City Code can't be * for on_search request"
                    },
                    "timestamp": {"type": "string", "format": "rfc3339-date-time"},
                    "ttl": {"type": "string", "format": "duration"}
                },
                "required": ["action", "city", "timestamp"]
            }
        },
        "required": ["context"]
    }))
}

#[test]
fn valid_payload_has_no_defects() {
    let schema = context_schema();
    let payload = json!({
        "context": {
            "action": "search",
            "city": "std:080",
            "timestamp": "2024-05-01T10:00:00.000Z",
            "ttl": "PT30S"
        }
    });
    assert!(validate(&schema, &payload).is_empty());
}

#[test]
fn missing_required_field_reports_child_path() {
    let schema = context_schema();
    let payload = json!({
        "context": {"city": "std:080", "timestamp": "2024-05-01T10:00:00.000Z"}
    });
    let defects = validate(&schema, &payload);
    assert_eq!(defects.len(), 1);
    assert_eq!(defects[0].path, "context.action");
    assert_eq!(defects[0].message, "required field missing");
    assert_eq!(defects[0].kind, DefectKind::SchemaDefect);
}

#[test]
fn wildcard_city_uses_node_error_message() {
    let schema = context_schema();
    let payload = json!({
        "context": {"action": "search", "city": "*", "timestamp": "2024-05-01T10:00:00.000Z"}
    });
    assert_eq!(
        paths(&schema, &payload),
        vec![(
            "context.city".to_string(),
            "City Code can't be * for on_search request".to_string()
        )]
    );
}

#[test]
fn type_mismatch_short_circuits() {
    let schema = context_schema();
    let defects = paths(&schema, &json!({"context": "not an object"}));
    assert_eq!(defects, vec![("context".to_string(), "must be object".to_string())]);
}

#[test]
fn root_defects_use_a_stable_label() {
    let schema = context_schema();
    let defects = paths(&schema, &json!(["not", "an", "object"]));
    assert_eq!(defects, vec![(ROOT_PATH.to_string(), "must be object".to_string())]);

    let defects = paths(&schema, &json!({}));
    assert_eq!(defects, vec![("context".to_string(), "required field missing".to_string())]);
}

#[test]
fn additional_properties_flagged_per_key() {
    let schema = compile(&json!({
        "type": "object",
        "properties": {"id": {"type": "string"}},
        "additionalProperties": false
    }));
    let defects = paths(&schema, &json!({"id": "P1", "extra": 1, "other": true}));
    assert_eq!(
        defects,
        vec![
            ("extra".to_string(), "must NOT have additional properties".to_string()),
            ("other".to_string(), "must NOT have additional properties".to_string()),
        ]
    );
}

#[test]
fn additional_properties_default_is_permissive() {
    let schema = compile(&json!({"type": "object", "properties": {"id": {"type": "string"}}}));
    assert!(validate(&schema, &json!({"id": "P1", "extra": 1})).is_empty());
}

#[test]
fn array_items_are_path_indexed() {
    let schema = compile(&json!({
        "type": "object",
        "properties": {
            "providers": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "properties": {"id": {"type": "string", "minLength": 1}},
                    "required": ["id"]
                }
            }
        }
    }));
    let defects = paths(&schema, &json!({"providers": [{"id": "P1"}, {}, {"id": ""}]}));
    assert_eq!(
        defects,
        vec![
            ("providers[1].id".to_string(), "required field missing".to_string()),
            ("providers[2].id".to_string(), "must NOT have fewer than 1 characters".to_string()),
        ]
    );
    let empty = paths(&schema, &json!({"providers": []}));
    assert_eq!(
        empty,
        vec![("providers".to_string(), "must NOT have fewer than 1 items".to_string())]
    );
}

#[test]
fn string_constraints_and_enums() {
    let schema = compile(&json!({
        "type": "object",
        "properties": {
            "code": {"type": "string", "maxLength": 3, "pattern": "^[A-Z]+$"},
            "state": {"type": "string", "enum": ["Created", "Accepted"]},
            "country": {"type": "string", "format": "country-code"}
        }
    }));
    let defects = paths(&schema, &json!({"code": "abcd", "state": "Lost", "country": "ZZ"}));
    assert_eq!(
        defects,
        vec![
            ("code".to_string(), "must NOT have more than 3 characters".to_string()),
            ("code".to_string(), "must match pattern \"^[A-Z]+$\"".to_string()),
            ("country".to_string(), "must match format \"country-code\"".to_string()),
            ("state".to_string(), "must be equal to one of the allowed values".to_string()),
        ]
    );
}

#[test]
fn length_counts_characters_not_bytes() {
    let schema = compile(&json!({"type": "string", "maxLength": 4}));
    assert!(validate(&schema, &json!("नमस्ते")).len() == 1);
    assert!(validate(&schema, &json!("café")).is_empty());
}

#[test]
fn error_message_overrides_required_defects() {
    let schema = compile(&json!({
        "type": "object",
        "required": ["billing"],
        "errorMessage": "billing details are mandatory"
    }));
    assert_eq!(
        paths(&schema, &json!({})),
        vec![("billing".to_string(), "billing details are mandatory".to_string())]
    );
}

#[test]
fn unknown_format_is_a_load_fault() {
    let err = SchemaDescriptor::compile(&json!({"type": "string", "format": "ipv4"})).unwrap_err();
    assert!(matches!(err, SchemaLoadError::UnknownFormat { .. }));
}

#[test]
fn invalid_pattern_and_keywords_are_load_faults() {
    let err = SchemaDescriptor::compile(&json!({"pattern": "(unclosed"})).unwrap_err();
    assert!(matches!(err, SchemaLoadError::InvalidPattern { .. }));
    let err = SchemaDescriptor::compile(&json!({"oneOf": []})).unwrap_err();
    assert!(matches!(err, SchemaLoadError::UnsupportedKeyword { .. }));
    let err = SchemaDescriptor::compile(&json!({"minItems": -1})).unwrap_err();
    assert!(matches!(err, SchemaLoadError::InvalidKeyword { .. }));
    let err = SchemaDescriptor::compile(&json!({"type": "decimal"})).unwrap_err();
    assert!(matches!(err, SchemaLoadError::UnknownType { .. }));
}

#[test]
fn annotations_are_ignored() {
    let schema = compile(&json!({"type": "string", "description": "city code", "title": "City"}));
    assert!(validate(&schema, &json!("std:080")).is_empty());
}
