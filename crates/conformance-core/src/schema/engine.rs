// crates/conformance-core/src/schema/engine.rs
// ============================================================================
// Module: Schema Validation Engine
// Description: Recursive-descent interpreter for compiled schema descriptors.
// Purpose: Produce ordered schema defects for any JSON value.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! [`validate`] walks a [`SchemaDescriptor`] and a value together and returns
//! every schema defect in discovery order. It never fails: malformed input is
//! reported as defects. A node whose `type` does not match stops there, and
//! nothing below it is checked. A node's `errorMessage` replaces the
//! generated message of every defect that node raises; defects raised by
//! child nodes keep their own messages. Defects on the validated value
//! itself are reported at [`ROOT_PATH`]; child paths start without a prefix.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

use crate::model::ValidationError;
use crate::schema::descriptor::SchemaDescriptor;

// ============================================================================
// SECTION: Messages
// ============================================================================

/// Message for an absent required key.
pub const REQUIRED_FIELD_MISSING: &str = "required field missing";
/// Message for an undeclared key under `additionalProperties: false`.
pub const ADDITIONAL_PROPERTY: &str = "must NOT have additional properties";
/// Path reported for defects raised by the document root itself.
pub const ROOT_PATH: &str = "payload";

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Validates a value against a descriptor, returning schema defects in order.
#[must_use]
pub fn validate(descriptor: &SchemaDescriptor, value: &Value) -> Vec<ValidationError> {
    let mut defects = Vec::new();
    validate_node(descriptor, value, "", &mut defects);
    defects
}

/// Returns true when the value satisfies the descriptor.
#[must_use]
pub fn conforms(descriptor: &SchemaDescriptor, value: &Value) -> bool {
    validate(descriptor, value).is_empty()
}

// ============================================================================
// SECTION: Node Validation
// ============================================================================

/// Validates one node and recurses into its children.
fn validate_node(node: &SchemaDescriptor, value: &Value, path: &str, out: &mut Vec<ValidationError>) {
    let mut emit = |at: &str, generated: String| {
        let message = node.error_message.clone().unwrap_or(generated);
        let at = if at.is_empty() { ROOT_PATH } else { at };
        out.push(ValidationError::schema(at, message));
    };

    if let Some(expected) = node.value_type
        && !expected.matches(value)
    {
        emit(path, format!("must be {}", expected.name()));
        return;
    }
    if let Some(constant) = &node.const_value
        && value != constant
    {
        emit(path, format!("must be equal to constant {constant}"));
    }
    if let Some(allowed) = &node.enum_values
        && !allowed.contains(value)
    {
        emit(path, "must be equal to one of the allowed values".to_string());
    }

    match value {
        Value::Object(map) => {
            check_object_keys(node, map, path, &mut emit);
        }
        Value::Array(elements) => {
            if let Some(min) = node.min_items
                && elements.len() < min
            {
                emit(path, format!("must NOT have fewer than {min} items"));
            }
        }
        Value::String(text) => check_string(node, text, path, &mut emit),
        _ => {}
    }

    if let Some(negated) = &node.not
        && conforms(negated, value)
    {
        emit(path, "must NOT be valid".to_string());
    }

    match value {
        Value::Object(map) => {
            for (name, child) in &node.properties {
                if let Some(child_value) = map.get(name) {
                    validate_node(child, child_value, &join_key(path, name), out);
                }
            }
        }
        Value::Array(elements) => {
            if let Some(items) = &node.items {
                for (index, element) in elements.iter().enumerate() {
                    validate_node(items, element, &join_index(path, index), out);
                }
            }
        }
        _ => {}
    }
}

/// Checks `required` and `additionalProperties` on an object.
fn check_object_keys(
    node: &SchemaDescriptor,
    map: &Map<String, Value>,
    path: &str,
    emit: &mut impl FnMut(&str, String),
) {
    for name in &node.required {
        if !map.contains_key(name) {
            emit(&join_key(path, name), REQUIRED_FIELD_MISSING.to_string());
        }
    }
    if node.deny_additional_properties {
        for key in map.keys() {
            if !node.declares(key) {
                emit(&join_key(path, key), ADDITIONAL_PROPERTY.to_string());
            }
        }
    }
}

/// Checks length, pattern, and format constraints on a string.
fn check_string(
    node: &SchemaDescriptor,
    text: &str,
    path: &str,
    emit: &mut impl FnMut(&str, String),
) {
    let length = text.chars().count();
    if let Some(min) = node.min_length
        && length < min
    {
        emit(path, format!("must NOT have fewer than {min} characters"));
    }
    if let Some(max) = node.max_length
        && length > max
    {
        emit(path, format!("must NOT have more than {max} characters"));
    }
    if let Some(pattern) = &node.pattern
        && !pattern.is_match(text)
    {
        emit(path, format!("must match pattern \"{}\"", pattern.source()));
    }
    if let Some(format) = node.format
        && !format.is_valid(text)
    {
        emit(path, format!("must match format \"{}\"", format.name()));
    }
}

// ============================================================================
// SECTION: Paths
// ============================================================================

/// Appends an object key to a dotted path.
fn join_key(path: &str, key: &str) -> String {
    if path.is_empty() { key.to_string() } else { format!("{path}.{key}") }
}

/// Appends an array index to a dotted path.
fn join_index(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}
