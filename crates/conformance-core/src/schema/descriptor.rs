// crates/conformance-core/src/schema/descriptor.rs
// ============================================================================
// Module: Schema Descriptors
// Description: Compiled, immutable schema descriptor trees.
// Purpose: Turn declarative JSON schema documents into checked data.
// Dependencies: regex, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`SchemaDescriptor`] is the compiled form of one node of a schema
//! document. Compilation resolves `format` names, compiles `pattern`
//! expressions, and rejects keywords outside the supported subset, so every
//! problem with a schema document is a [`SchemaLoadError`] raised at catalog
//! load rather than a surprise during request handling.
//!
//! Supported keywords: `type`, `properties`, `required`,
//! `additionalProperties`, `items`, `minLength`, `maxLength`, `minItems`,
//! `pattern`, `format`, `enum`, `const`, `not`, `errorMessage`. Annotation
//! keywords (`description`, `title`, `$comment`) are accepted and ignored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::schema::formats::Format;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Keywords with no validation meaning.
const ANNOTATION_KEYWORDS: [&str; 3] = ["description", "title", "$comment"];

// ============================================================================
// SECTION: Value Types
// ============================================================================

/// JSON value type named by the `type` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// JSON object.
    Object,
    /// JSON array.
    Array,
    /// JSON string.
    String,
    /// Any JSON number.
    Number,
    /// JSON number with no fractional part.
    Integer,
    /// JSON boolean.
    Boolean,
    /// JSON null.
    Null,
}

impl ValueType {
    /// Resolves a `type` keyword value.
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    /// Returns the type name used in defect messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }

    /// Returns true when the value has this type.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|number| number.fract() == 0.0)
            }
            Self::Boolean => value.is_boolean(),
            Self::Null => value.is_null(),
        }
    }
}

// ============================================================================
// SECTION: Pattern
// ============================================================================

/// Compiled `pattern` keyword, keeping its source for messages.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// Source expression as written in the document.
    source: String,
    /// Compiled expression.
    regex: Regex,
}

impl Pattern {
    /// Returns the source expression.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns true when the expression matches anywhere in the text.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

// ============================================================================
// SECTION: Descriptor
// ============================================================================

/// Compiled schema node.
///
/// # Invariants
/// - Immutable after compilation; shared read-only across validations.
/// - `properties` are held in `serde_json` map order (sorted by key).
#[derive(Debug, Clone, Default)]
pub struct SchemaDescriptor {
    /// Required JSON type, if any.
    pub value_type: Option<ValueType>,
    /// Declared object properties.
    pub properties: Vec<(String, Self)>,
    /// Required object keys, in document order.
    pub required: Vec<String>,
    /// Whether undeclared object keys are rejected (`additionalProperties: false`).
    pub deny_additional_properties: bool,
    /// Descriptor applied to every array element.
    pub items: Option<Box<Self>>,
    /// Minimum string length in characters.
    pub min_length: Option<usize>,
    /// Maximum string length in characters.
    pub max_length: Option<usize>,
    /// Minimum array length.
    pub min_items: Option<usize>,
    /// Regular expression strings must match.
    pub pattern: Option<Pattern>,
    /// Named string format.
    pub format: Option<Format>,
    /// Fixed value the instance must equal.
    pub const_value: Option<Value>,
    /// Allowed values.
    pub enum_values: Option<Vec<Value>>,
    /// Descriptor the instance must not satisfy.
    pub not: Option<Box<Self>>,
    /// Message replacing every generated message raised at this node.
    pub error_message: Option<String>,
}

impl SchemaDescriptor {
    /// Compiles a schema document.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaLoadError`] when the document uses an unsupported
    /// keyword, an unknown type or format, an invalid pattern, or a keyword
    /// value of the wrong shape.
    pub fn compile(document: &Value) -> Result<Self, SchemaLoadError> {
        compile_node(document, "#")
    }

    /// Returns the descriptor declared for a property.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Self> {
        self.properties.iter().find(|(key, _)| key == name).map(|(_, node)| node)
    }

    /// Returns true when the property is declared.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.properties.iter().any(|(key, _)| key == name)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Schema document faults detected at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaLoadError {
    /// A schema node is not a JSON object.
    #[error("schema node at {location} must be an object")]
    NotAnObject {
        /// Location of the node inside the document.
        location: String,
    },
    /// Unsupported keyword.
    #[error("unsupported keyword `{keyword}` at {location}")]
    UnsupportedKeyword {
        /// Location of the node inside the document.
        location: String,
        /// Offending keyword.
        keyword: String,
    },
    /// Keyword value has the wrong shape.
    #[error("invalid `{keyword}` at {location}: {reason}")]
    InvalidKeyword {
        /// Location of the node inside the document.
        location: String,
        /// Offending keyword.
        keyword: String,
        /// Description of the expected shape.
        reason: String,
    },
    /// Unknown `type` name.
    #[error("unknown type `{name}` at {location}")]
    UnknownType {
        /// Location of the node inside the document.
        location: String,
        /// Offending type name.
        name: String,
    },
    /// Unknown `format` name.
    #[error("unknown format `{name}` at {location}")]
    UnknownFormat {
        /// Location of the node inside the document.
        location: String,
        /// Offending format name.
        name: String,
    },
    /// `pattern` failed to compile.
    #[error("invalid pattern `{pattern}` at {location}: {reason}")]
    InvalidPattern {
        /// Location of the node inside the document.
        location: String,
        /// Source expression.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },
    /// A schema was registered twice under the same key.
    #[error("duplicate schema registration: {0}")]
    Duplicate(String),
}

// ============================================================================
// SECTION: Compilation
// ============================================================================

/// Compiles one node located at `location`.
fn compile_node(document: &Value, location: &str) -> Result<SchemaDescriptor, SchemaLoadError> {
    let Value::Object(map) = document else {
        return Err(SchemaLoadError::NotAnObject {
            location: location.to_string(),
        });
    };
    let mut node = SchemaDescriptor::default();
    for (keyword, value) in map {
        match keyword.as_str() {
            "type" => {
                let name = expect_str(value, keyword, location)?;
                node.value_type = Some(ValueType::from_name(name).ok_or_else(|| {
                    SchemaLoadError::UnknownType {
                        location: location.to_string(),
                        name: name.to_string(),
                    }
                })?);
            }
            "properties" => node.properties = compile_properties(value, location)?,
            "required" => node.required = expect_str_list(value, keyword, location)?,
            "additionalProperties" => {
                let allowed = value
                    .as_bool()
                    .ok_or_else(|| invalid(location, keyword, "expected a boolean"))?;
                node.deny_additional_properties = !allowed;
            }
            "items" => {
                let child = compile_node(value, &format!("{location}/items"))?;
                node.items = Some(Box::new(child));
            }
            "minLength" => node.min_length = Some(expect_count(value, keyword, location)?),
            "maxLength" => node.max_length = Some(expect_count(value, keyword, location)?),
            "minItems" => node.min_items = Some(expect_count(value, keyword, location)?),
            "pattern" => node.pattern = Some(compile_pattern(value, location)?),
            "format" => {
                let name = expect_str(value, keyword, location)?;
                node.format = Some(Format::from_name(name).ok_or_else(|| {
                    SchemaLoadError::UnknownFormat {
                        location: location.to_string(),
                        name: name.to_string(),
                    }
                })?);
            }
            "const" => node.const_value = Some(value.clone()),
            "enum" => {
                let values = value
                    .as_array()
                    .filter(|values| !values.is_empty())
                    .ok_or_else(|| invalid(location, keyword, "expected a non-empty array"))?;
                node.enum_values = Some(values.clone());
            }
            "not" => {
                let child = compile_node(value, &format!("{location}/not"))?;
                node.not = Some(Box::new(child));
            }
            "errorMessage" => {
                node.error_message = Some(expect_str(value, keyword, location)?.to_string());
            }
            other if ANNOTATION_KEYWORDS.contains(&other) => {}
            other => {
                return Err(SchemaLoadError::UnsupportedKeyword {
                    location: location.to_string(),
                    keyword: other.to_string(),
                });
            }
        }
    }
    Ok(node)
}

/// Compiles the `properties` map.
fn compile_properties(
    value: &Value,
    location: &str,
) -> Result<Vec<(String, SchemaDescriptor)>, SchemaLoadError> {
    let map: &Map<String, Value> =
        value.as_object().ok_or_else(|| invalid(location, "properties", "expected an object"))?;
    map.iter()
        .map(|(name, child)| {
            let child_location = format!("{location}/properties/{name}");
            compile_node(child, &child_location).map(|node| (name.clone(), node))
        })
        .collect()
}

/// Compiles the `pattern` keyword.
fn compile_pattern(value: &Value, location: &str) -> Result<Pattern, SchemaLoadError> {
    let source = expect_str(value, "pattern", location)?;
    let regex = Regex::new(source).map_err(|err| SchemaLoadError::InvalidPattern {
        location: location.to_string(),
        pattern: source.to_string(),
        reason: err.to_string(),
    })?;
    Ok(Pattern {
        source: source.to_string(),
        regex,
    })
}

/// Reads a string keyword value.
fn expect_str<'a>(
    value: &'a Value,
    keyword: &str,
    location: &str,
) -> Result<&'a str, SchemaLoadError> {
    value.as_str().ok_or_else(|| invalid(location, keyword, "expected a string"))
}

/// Reads a list of strings.
fn expect_str_list(
    value: &Value,
    keyword: &str,
    location: &str,
) -> Result<Vec<String>, SchemaLoadError> {
    let entries =
        value.as_array().ok_or_else(|| invalid(location, keyword, "expected an array"))?;
    entries
        .iter()
        .map(|entry| {
            entry
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid(location, keyword, "expected an array of strings"))
        })
        .collect()
}

/// Reads a non-negative integer keyword value.
fn expect_count(value: &Value, keyword: &str, location: &str) -> Result<usize, SchemaLoadError> {
    value
        .as_u64()
        .and_then(|count| usize::try_from(count).ok())
        .ok_or_else(|| invalid(location, keyword, "expected a non-negative integer"))
}

/// Builds an [`SchemaLoadError::InvalidKeyword`].
fn invalid(location: &str, keyword: &str, reason: &str) -> SchemaLoadError {
    SchemaLoadError::InvalidKeyword {
        location: location.to_string(),
        keyword: keyword.to_string(),
        reason: reason.to_string(),
    }
}
