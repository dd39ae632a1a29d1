// crates/conformance-rules/src/catalog.rs
// ============================================================================
// Module: Built-in Catalog
// Description: Assembles schema and action registries for supported domains.
// Purpose: Build every registry once at startup and fail on bad documents.
// Dependencies: conformance-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The catalog compiles the embedded schema documents, pairs each with its
//! business checker, and registers both. Any fault (a document that does not
//! parse, an unknown format, a duplicate key) aborts the build, so a process
//! that starts has a complete and consistent catalog.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use conformance_core::ActionCall;
use conformance_core::ActionName;
use conformance_core::ActionRegistry;
use conformance_core::ActionRule;
use conformance_core::CheckerOutput;
use conformance_core::CoreVersion;
use conformance_core::DomainFamily;
use conformance_core::SchemaLoadError;
use conformance_core::SchemaRegistry;
use conformance_core::ValidationSession;
use serde_json::Value;
use thiserror::Error;

use crate::retail_v120;
use crate::retail_v125;

// ============================================================================
// SECTION: Built-in Tables
// ============================================================================

/// Checker function signature used by the built-in tables.
type CheckerFn = fn(&ActionCall<'_>, &ValidationSession) -> CheckerOutput;

/// Built-in registration: version, action, schema source, checker.
type BuiltinAction = (&'static str, &'static str, &'static str, CheckerFn);

/// Retail actions with embedded schemas.
const RETAIL_ACTIONS: [BuiltinAction; 12] = [
    ("1.2.5", "search", include_str!("../schemas/retail/1.2.5/search.json"), retail_v125::check_search),
    ("1.2.5", "on_search", include_str!("../schemas/retail/1.2.5/on_search.json"), retail_v125::check_on_search),
    ("1.2.5", "select", include_str!("../schemas/retail/1.2.5/select.json"), retail_v125::check_select),
    ("1.2.5", "on_select", include_str!("../schemas/retail/1.2.5/on_select.json"), retail_v125::check_on_select),
    ("1.2.5", "init", include_str!("../schemas/retail/1.2.5/init.json"), retail_v125::check_init),
    ("1.2.5", "on_init", include_str!("../schemas/retail/1.2.5/on_init.json"), retail_v125::check_on_init),
    ("1.2.5", "confirm", include_str!("../schemas/retail/1.2.5/confirm.json"), retail_v125::check_confirm),
    ("1.2.5", "on_confirm", include_str!("../schemas/retail/1.2.5/on_confirm.json"), retail_v125::check_on_confirm),
    ("1.2.5", "cancel", include_str!("../schemas/retail/1.2.5/cancel.json"), retail_v125::check_cancel),
    ("1.2.5", "on_cancel", include_str!("../schemas/retail/1.2.5/on_cancel.json"), retail_v125::check_on_cancel),
    ("1.2.0", "search", include_str!("../schemas/retail/1.2.0/search.json"), retail_v120::check_search),
    ("1.2.0", "on_search", include_str!("../schemas/retail/1.2.0/on_search.json"), retail_v120::check_on_search),
];

/// Retail domain-variant overrides: version, variant, action, checker.
const RETAIL_VARIANTS: [(&str, &str, &str, CheckerFn); 1] =
    [("1.2.5", "RET11", "on_search", retail_v125::check_on_search_ret11)];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Catalog build faults.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Embedded document is not valid JSON.
    #[error("schema document {name} is not valid json: {reason}")]
    Document {
        /// Document name (`family/version/action`).
        name: String,
        /// Parser diagnostic.
        reason: String,
    },
    /// Schema document failed to compile or register.
    #[error("schema {name}: {source}")]
    Schema {
        /// Document name (`family/version/action`).
        name: String,
        /// Compilation fault.
        #[source]
        source: SchemaLoadError,
    },
    /// Action rule registered twice.
    #[error("duplicate action rule: {0}")]
    DuplicateRule(String),
    /// Variant rule refers to an action with no schema.
    #[error("variant rule {0} has no registered schema")]
    MissingSchema(String),
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Schema and action registries for every served domain family.
///
/// # Invariants
/// - Immutable after [`Catalog::builtin`] returns.
/// - Every action rule carries the schema registered under the same key.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Compiled schemas and raw documents.
    schemas: SchemaRegistry,
    /// Action registries keyed by family.
    actions: BTreeMap<DomainFamily, ActionRegistry>,
}

impl Catalog {
    /// Builds the built-in catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when an embedded document is invalid or a key
    /// is registered twice.
    pub fn builtin() -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for (version, action, source, checker) in RETAIL_ACTIONS {
            catalog.register(DomainFamily::Retail, version, action, source, checker)?;
        }
        for (version, variant, action, checker) in RETAIL_VARIANTS {
            catalog.register_variant(DomainFamily::Retail, version, variant, action, checker)?;
        }
        Ok(catalog)
    }

    /// Registers a schema document and its generic checker.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the document is invalid or the key is taken.
    pub fn register(
        &mut self,
        family: DomainFamily,
        version: &str,
        action: &str,
        source: &str,
        checker: CheckerFn,
    ) -> Result<(), CatalogError> {
        let name = format!("{family}/{version}/{action}");
        let document: Value = serde_json::from_str(source).map_err(|err| CatalogError::Document {
            name: name.clone(),
            reason: err.to_string(),
        })?;
        let version = CoreVersion::new(version);
        let action = ActionName::new(action);
        self.schemas
            .register(family, version.clone(), action.clone(), document)
            .map_err(|source| CatalogError::Schema {
                name: name.clone(),
                source,
            })?;
        let descriptor =
            self.schemas.get(family, &version, &action).map(|entry| Arc::clone(&entry.descriptor));
        let rule = ActionRule::new(descriptor, Arc::new(checker));
        if !self.actions.entry(family).or_default().register(version, action, rule) {
            return Err(CatalogError::DuplicateRule(name));
        }
        Ok(())
    }

    /// Registers a domain-variant checker reusing the generic schema.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when no schema exists or the key is taken.
    pub fn register_variant(
        &mut self,
        family: DomainFamily,
        version: &str,
        variant: &str,
        action: &str,
        checker: CheckerFn,
    ) -> Result<(), CatalogError> {
        let name = format!("{family}/{version}/{variant}/{action}");
        let version = CoreVersion::new(version);
        let action = ActionName::new(action);
        let descriptor = self
            .schemas
            .get(family, &version, &action)
            .map(|entry| Arc::clone(&entry.descriptor))
            .ok_or_else(|| CatalogError::MissingSchema(name.clone()))?;
        let rule = ActionRule::new(Some(descriptor), Arc::new(checker));
        if !self.actions.entry(family).or_default().register_variant(version, variant, action, rule)
        {
            return Err(CatalogError::DuplicateRule(name));
        }
        Ok(())
    }

    /// Returns the schema registry.
    #[must_use]
    pub const fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Returns the action registry for a family, when the family is served.
    #[must_use]
    pub fn actions(&self, family: DomainFamily) -> Option<&ActionRegistry> {
        self.actions.get(&family)
    }

    /// Returns true when the family has a registered catalog.
    #[must_use]
    pub fn serves(&self, family: DomainFamily) -> bool {
        self.actions.contains_key(&family)
    }

    /// Returns the served families.
    pub fn families(&self) -> impl Iterator<Item = DomainFamily> + '_ {
        self.actions.keys().copied()
    }
}
