// crates/conformance-core/src/model/defect.rs
// ============================================================================
// Module: Conformance Gate Defect Taxonomy
// Description: Tagged validation defects and the bucket/merge policy.
// Purpose: One representation for schema and business defects, one merge.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every defect is a [`ValidationError`] tagged with a [`DefectKind`].
//! Validators return defects as data, never as `Err`. A
//! [`ValidationOutcome`] remembers whether its producer kept schema and
//! business defects apart; [`select_errors`] turns an outcome into the
//! path-to-message [`DefectMap`] surfaced to callers.
//!
//! Merge precedence: in merged mode a bucketed outcome is written schema
//! first, business second, so a business defect replaces a schema defect on
//! the same path. Flat outcomes are written in discovery order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;
use serde::ser::SerializeMap;

// ============================================================================
// SECTION: Defects
// ============================================================================

/// Defect classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectKind {
    /// Structural or format non-conformance.
    SchemaDefect,
    /// Semantic, cross-field, or cross-call non-conformance.
    BusinessDefect,
}

/// A single defect found while validating a payload.
///
/// # Invariants
/// - Immutable once created; discovery order is meaningful to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Dotted path of the offending value (`message.order.items[0].id`).
    pub path: String,
    /// Defect classification.
    pub kind: DefectKind,
    /// Human-readable description.
    pub message: String,
}

impl ValidationError {
    /// Creates a schema defect.
    #[must_use]
    pub fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: DefectKind::SchemaDefect,
            message: message.into(),
        }
    }

    /// Creates a business defect.
    #[must_use]
    pub fn business(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: DefectKind::BusinessDefect,
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Validation Mode
// ============================================================================

/// Which defect bucket a caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Schema defects only (`validationMode = true`).
    SchemaOnly,
    /// Business defects only (`validationMode = false`).
    BusinessOnly,
    /// Both buckets merged (`validationMode` absent).
    #[default]
    Merged,
}

impl ValidationMode {
    /// Maps the wire-level tri-state flag onto a mode.
    #[must_use]
    pub const fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => Self::SchemaOnly,
            Some(false) => Self::BusinessOnly,
            None => Self::Merged,
        }
    }
}

// ============================================================================
// SECTION: Validation Outcome
// ============================================================================

/// Normalized result of running one action's validators.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationOutcome {
    /// Defects in discovery order.
    errors: Vec<ValidationError>,
    /// Whether the producer distinguished schema and business buckets.
    bucketed: bool,
}

impl ValidationOutcome {
    /// Builds an outcome from a producer that never separated buckets.
    #[must_use]
    pub const fn flat(errors: Vec<ValidationError>) -> Self {
        Self {
            errors,
            bucketed: false,
        }
    }

    /// Builds an outcome from separate schema and business buckets.
    #[must_use]
    pub fn bucketed(schema: Vec<ValidationError>, business: Vec<ValidationError>) -> Self {
        let mut errors = schema;
        errors.extend(business);
        Self {
            errors,
            bucketed: true,
        }
    }

    /// Returns every defect in discovery order.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Returns true when the producer kept buckets apart.
    #[must_use]
    pub const fn is_bucketed(&self) -> bool {
        self.bucketed
    }

    /// Returns true when no defect was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterates defects of one kind in discovery order.
    pub fn of_kind(&self, kind: DefectKind) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |error| error.kind == kind)
    }
}

// ============================================================================
// SECTION: Defect Map
// ============================================================================

/// Insertion-ordered mapping from defect path to message.
///
/// # Invariants
/// - Paths are unique; re-inserting a path replaces its message in place.
/// - Serializes as a JSON object in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DefectMap {
    /// Path/message entries in insertion order.
    entries: Vec<(String, String)>,
}

impl DefectMap {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts a message, replacing any previous message at the same path.
    pub fn insert(&mut self, path: impl Into<String>, message: impl Into<String>) {
        let path = path.into();
        let message = message.into();
        if let Some(entry) = self.entries.iter_mut().find(|(existing, _)| *existing == path) {
            entry.1 = message;
        } else {
            self.entries.push((path, message));
        }
    }

    /// Returns the message recorded at a path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.iter().find(|(existing, _)| existing == path).map(|(_, msg)| msg.as_str())
    }

    /// Returns the number of paths with a defect.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no defect is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(path, message)| (path.as_str(), message.as_str()))
    }

    /// Keeps only the first `limit` entries.
    pub fn truncate(&mut self, limit: usize) {
        self.entries.truncate(limit);
    }
}

impl Serialize for DefectMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (path, message) in &self.entries {
            map.serialize_entry(path, message)?;
        }
        map.end()
    }
}

// ============================================================================
// SECTION: Selection
// ============================================================================

/// Selects and merges defects for the requested mode.
///
/// Schema-only and business-only modes partition the outcome by kind. Merged
/// mode replays a flat outcome in discovery order; a bucketed outcome is
/// written schema bucket first, so business messages win on shared paths.
#[must_use]
pub fn select_errors(outcome: &ValidationOutcome, mode: ValidationMode) -> DefectMap {
    let mut map = DefectMap::new();
    match mode {
        ValidationMode::SchemaOnly => write_kind(&mut map, outcome, DefectKind::SchemaDefect),
        ValidationMode::BusinessOnly => write_kind(&mut map, outcome, DefectKind::BusinessDefect),
        ValidationMode::Merged if outcome.is_bucketed() => {
            write_kind(&mut map, outcome, DefectKind::SchemaDefect);
            write_kind(&mut map, outcome, DefectKind::BusinessDefect);
        }
        ValidationMode::Merged => {
            for error in outcome.errors() {
                map.insert(error.path.clone(), error.message.clone());
            }
        }
    }
    map
}

/// Writes every defect of one kind into the map.
fn write_kind(map: &mut DefectMap, outcome: &ValidationOutcome, kind: DefectKind) {
    for error in outcome.of_kind(kind) {
        map.insert(error.path.clone(), error.message.clone());
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use super::DefectMap;

    #[test]
    fn reinsert_keeps_original_position() {
        let mut map = DefectMap::new();
        map.insert("a", "first");
        map.insert("b", "second");
        map.insert("a", "replaced");
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries, vec![("a", "replaced"), ("b", "second")]);
    }

    #[test]
    fn serializes_in_insertion_order() {
        let mut map = DefectMap::new();
        map.insert("z", "1");
        map.insert("a", "2");
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"z":"1","a":"2"}"#);
    }
}
