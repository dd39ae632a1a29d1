// crates/conformance-core/src/schema/registry.rs
// ============================================================================
// Module: Schema Registry
// Description: Immutable table of compiled schemas keyed by family, version, action.
// Purpose: Resolve the wire schema for a call and expose raw documents.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The registry is populated once while the catalog is built and is then
//! shared read-only behind an `Arc`. Every entry keeps both the compiled
//! [`SchemaDescriptor`] used by the engine and the raw document returned by
//! the validation-format endpoint.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::model::ActionName;
use crate::model::CoreVersion;
use crate::model::DomainFamily;
use crate::schema::descriptor::SchemaDescriptor;
use crate::schema::descriptor::SchemaLoadError;

// ============================================================================
// SECTION: Entries
// ============================================================================

/// Registry key.
type SchemaKey = (DomainFamily, CoreVersion, ActionName);

/// Registered schema: compiled descriptor plus source document.
#[derive(Debug, Clone)]
pub struct SchemaEntry {
    /// Compiled descriptor.
    pub descriptor: Arc<SchemaDescriptor>,
    /// Document the descriptor was compiled from.
    pub document: Arc<Value>,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Compiled schemas keyed by `(family, version, action)`.
///
/// # Invariants
/// - Keys are unique; registering a key twice fails.
/// - Entries never change after registration.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    /// Entries ordered by key.
    entries: BTreeMap<SchemaKey, SchemaEntry>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles and registers a schema document.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaLoadError`] when the document does not compile or the
    /// key is already registered.
    pub fn register(
        &mut self,
        family: DomainFamily,
        version: CoreVersion,
        action: ActionName,
        document: Value,
    ) -> Result<(), SchemaLoadError> {
        let key = (family, version, action);
        if self.entries.contains_key(&key) {
            let (family, version, action) = key;
            return Err(SchemaLoadError::Duplicate(format!("{family}/{version}/{action}")));
        }
        let descriptor = SchemaDescriptor::compile(&document)?;
        self.entries.insert(
            key,
            SchemaEntry {
                descriptor: Arc::new(descriptor),
                document: Arc::new(document),
            },
        );
        Ok(())
    }

    /// Returns the schema registered for a call.
    #[must_use]
    pub fn get(
        &self,
        family: DomainFamily,
        version: &CoreVersion,
        action: &ActionName,
    ) -> Option<&SchemaEntry> {
        self.entries.get(&(family, version.clone(), action.clone()))
    }

    /// Returns the raw documents for one family and version, keyed by action.
    #[must_use]
    pub fn documents_for(
        &self,
        family: DomainFamily,
        version: &CoreVersion,
    ) -> BTreeMap<ActionName, Arc<Value>> {
        self.entries
            .iter()
            .filter(|((entry_family, entry_version, _), _)| {
                *entry_family == family && entry_version == version
            })
            .map(|((_, _, action), entry)| (action.clone(), Arc::clone(&entry.document)))
            .collect()
    }

    /// Returns true when any schema is registered for the family.
    #[must_use]
    pub fn serves(&self, family: DomainFamily) -> bool {
        self.entries.keys().any(|(entry_family, _, _)| *entry_family == family)
    }

    /// Returns the number of registered schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
