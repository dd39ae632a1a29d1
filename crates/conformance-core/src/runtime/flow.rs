// crates/conformance-core/src/runtime/flow.rs
// ============================================================================
// Module: Flow Validation
// Description: Runs every call of a transaction flow through one session.
// Purpose: Validate a whole flow payload in protocol call order.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A flow payload maps action names to `{context, message}` pairs. Known
//! actions run in protocol call order so callbacks see their requests; any
//! other action present runs afterwards in key order. All calls share a single
//! [`ValidationSession`], which is how duplicate message identifiers and
//! cross-call inconsistencies are detected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde::Serializer;
use serde::ser::SerializeMap;
use serde_json::Map;
use serde_json::Value;

use crate::model::ActionName;
use crate::model::CoreVersion;
use crate::model::DefectMap;
use crate::model::DomainCode;
use crate::model::ValidationMode;
use crate::model::ValidationOutcome;
use crate::model::select_errors;
use crate::runtime::dispatch::ActionRegistry;
use crate::runtime::dispatch::DispatchError;
use crate::runtime::session::ValidationSession;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Protocol call order for a retail transaction flow.
pub const FLOW_ORDER: [&str; 10] = [
    "search",
    "on_search",
    "select",
    "on_select",
    "init",
    "on_init",
    "confirm",
    "on_confirm",
    "cancel",
    "on_cancel",
];

// ============================================================================
// SECTION: Flow Report
// ============================================================================

/// Per-action outcomes of a flow, in validation order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlowReport {
    /// Outcomes in the order the actions were validated.
    outcomes: Vec<(ActionName, ValidationOutcome)>,
}

impl FlowReport {
    /// Returns the outcomes in validation order.
    #[must_use]
    pub fn outcomes(&self) -> &[(ActionName, ValidationOutcome)] {
        &self.outcomes
    }

    /// Returns true when every action validated clean.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| outcome.is_clean())
    }

    /// Selects defects per action, omitting actions with none.
    ///
    /// `limit` caps the number of paths reported per action.
    #[must_use]
    pub fn defects(&self, mode: ValidationMode, limit: Option<usize>) -> ActionDefects {
        let entries = self
            .outcomes
            .iter()
            .filter_map(|(action, outcome)| {
                let mut selected = select_errors(outcome, mode);
                if let Some(limit) = limit {
                    selected.truncate(limit);
                }
                (!selected.is_empty()).then(|| (action.clone(), selected))
            })
            .collect();
        ActionDefects {
            entries,
        }
    }
}

/// Defect maps keyed by action, serialized as an ordered JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionDefects {
    /// Action/defect entries in validation order.
    entries: Vec<(ActionName, DefectMap)>,
}

impl ActionDefects {
    /// Returns true when no action has a defect.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the defects for one action.
    #[must_use]
    pub fn get(&self, action: &str) -> Option<&DefectMap> {
        self.entries.iter().find(|(name, _)| name.as_str() == action).map(|(_, map)| map)
    }
}

impl Serialize for ActionDefects {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (action, defects) in &self.entries {
            map.serialize_entry(action.as_str(), defects)?;
        }
        map.end()
    }
}

// ============================================================================
// SECTION: Flow Validation
// ============================================================================

/// Returns the action names of a flow payload in validation order.
#[must_use]
pub fn ordered_actions(flow: &Map<String, Value>) -> Vec<ActionName> {
    let known = FLOW_ORDER.iter().filter(|action| flow.contains_key(**action)).copied();
    let others = flow.keys().map(String::as_str).filter(|action| !FLOW_ORDER.contains(action));
    known.chain(others).map(ActionName::from).collect()
}

/// Validates every call of a flow payload through one session.
///
/// # Errors
///
/// Returns [`DispatchError`] on the first action the registry does not
/// support. A flow with an unsupported action produces no partial report.
pub fn validate_flow(
    registry: &ActionRegistry,
    version: &CoreVersion,
    domain: &DomainCode,
    flow: &Map<String, Value>,
    session: &mut ValidationSession,
) -> Result<FlowReport, DispatchError> {
    let actions = ordered_actions(flow);
    for action in &actions {
        registry.resolve(version, domain, action)?;
    }
    let mut report = FlowReport::default();
    for action in actions {
        let payload = flow.get(action.as_str()).unwrap_or(&Value::Null);
        let outcome = registry.run_action(version, domain, &action, payload, session)?;
        report.outcomes.push((action, outcome));
    }
    Ok(report)
}
