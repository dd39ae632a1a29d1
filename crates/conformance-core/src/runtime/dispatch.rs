// crates/conformance-core/src/runtime/dispatch.rs
// ============================================================================
// Module: Action Dispatch
// Description: Immutable action registry and the per-call validation pipeline.
// Purpose: Resolve the rule for a call and run schema and business checks.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`ActionRegistry`] maps `(version, domain variant, action)` to an
//! [`ActionRule`]. Lookup tries the variant-specific entry first and falls
//! back to the generic entry for the action. [`ActionRegistry::run_action`]
//! runs one call through the pipeline:
//!
//! 1. register the request message identifier with the session,
//! 2. validate the payload against the rule schema,
//! 3. run the business checker against the session history,
//! 4. normalize everything into a [`ValidationOutcome`],
//! 5. append the call to the session history.
//!
//! Unsupported versions and actions are usage faults returned as
//! [`DispatchError`], never as defects.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::interfaces::ActionCall;
use crate::interfaces::ActionChecker;
use crate::interfaces::CheckerOutput;
use crate::model::ActionName;
use crate::model::CoreVersion;
use crate::model::DomainCode;
use crate::model::ValidationError;
use crate::model::ValidationOutcome;
use crate::runtime::session::PriorCall;
use crate::runtime::session::ValidationSession;
use crate::schema::SchemaDescriptor;
use crate::schema::validate;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Path of the message identifier inside a payload.
pub const MESSAGE_ID_PATH: &str = "context.message_id";
/// Defect message for a repeated request message identifier.
pub const DUPLICATE_MESSAGE_ID: &str = "duplicate message id within flow";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Dispatch usage faults.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No rule is registered for the protocol version.
    #[error("unsupported core version: {0}")]
    UnsupportedVersion(CoreVersion),
    /// No rule is registered for the action under this version.
    #[error("unsupported action for version {version}: {action}")]
    UnsupportedAction {
        /// Requested version.
        version: CoreVersion,
        /// Requested action.
        action: ActionName,
    },
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Schema and checker registered for one action.
#[derive(Clone)]
pub struct ActionRule {
    /// Wire schema for the whole `{context, message}` payload.
    pub schema: Option<Arc<SchemaDescriptor>>,
    /// Business checker.
    pub checker: Arc<dyn ActionChecker>,
}

impl ActionRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(schema: Option<Arc<SchemaDescriptor>>, checker: Arc<dyn ActionChecker>) -> Self {
        Self {
            schema,
            checker,
        }
    }
}

impl std::fmt::Debug for ActionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRule").field("has_schema", &self.schema.is_some()).finish()
    }
}

/// Registry key: version, optional domain variant, action.
type RuleKey = (CoreVersion, Option<String>, ActionName);

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Immutable action rule table.
///
/// # Invariants
/// - Populated before first use and shared read-only afterwards.
/// - A variant entry shadows the generic entry for that variant only.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    /// Rules keyed by version, variant, and action.
    rules: BTreeMap<RuleKey, ActionRule>,
    /// Versions with at least one rule.
    versions: BTreeSet<CoreVersion>,
}

impl ActionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the generic rule for an action; returns false on a duplicate.
    pub fn register(&mut self, version: CoreVersion, action: ActionName, rule: ActionRule) -> bool {
        self.insert((version, None, action), rule)
    }

    /// Registers a rule for one domain variant; returns false on a duplicate.
    pub fn register_variant(
        &mut self,
        version: CoreVersion,
        variant: &str,
        action: ActionName,
        rule: ActionRule,
    ) -> bool {
        self.insert((version, Some(variant.to_string()), action), rule)
    }

    /// Inserts a rule unless the key is taken.
    fn insert(&mut self, key: RuleKey, rule: ActionRule) -> bool {
        if self.rules.contains_key(&key) {
            return false;
        }
        self.versions.insert(key.0.clone());
        self.rules.insert(key, rule);
        true
    }

    /// Returns the registered versions.
    pub fn versions(&self) -> impl Iterator<Item = &CoreVersion> {
        self.versions.iter()
    }

    /// Resolves the rule for a call.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the version or action is unsupported.
    pub fn resolve(
        &self,
        version: &CoreVersion,
        domain: &DomainCode,
        action: &ActionName,
    ) -> Result<&ActionRule, DispatchError> {
        if !self.versions.contains(version) {
            return Err(DispatchError::UnsupportedVersion(version.clone()));
        }
        let variant_key = (version.clone(), Some(domain.variant().to_string()), action.clone());
        let generic_key = (version.clone(), None, action.clone());
        self.rules.get(&variant_key).or_else(|| self.rules.get(&generic_key)).ok_or_else(|| {
            DispatchError::UnsupportedAction {
                version: version.clone(),
                action: action.clone(),
            }
        })
    }

    /// Validates one call and records it in the session.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the version or action is unsupported.
    /// The session is left untouched in that case.
    pub fn run_action(
        &self,
        version: &CoreVersion,
        domain: &DomainCode,
        action: &ActionName,
        payload: &Value,
        session: &mut ValidationSession,
    ) -> Result<ValidationOutcome, DispatchError> {
        let rule = self.resolve(version, domain, action)?;

        let mut sequence = Vec::new();
        if !action.is_callback()
            && let Some(message_id) =
                payload.pointer("/context/message_id").and_then(Value::as_str)
            && !session.register_message_id(message_id)
        {
            sequence.push(ValidationError::business(MESSAGE_ID_PATH, DUPLICATE_MESSAGE_ID));
        }

        let mut schema_defects =
            rule.schema.as_deref().map(|schema| validate(schema, payload)).unwrap_or_default();

        let call = ActionCall {
            version,
            domain,
            action,
            payload,
        };
        let outcome = match rule.checker.check(&call, session) {
            CheckerOutput::Flat(found) => {
                schema_defects.extend(sequence);
                schema_defects.extend(found);
                ValidationOutcome::flat(schema_defects)
            }
            CheckerOutput::Bucketed {
                schema,
                business,
            } => {
                schema_defects.extend(schema);
                sequence.extend(business);
                ValidationOutcome::bucketed(schema_defects, sequence)
            }
        };

        session.record(PriorCall::from_payload(action.clone(), payload));
        Ok(outcome)
    }
}
