// crates/conformance-core/src/runtime/session.rs
// ============================================================================
// Module: Validation Session
// Description: Call-scoped sequence state for one validation request.
// Purpose: Give checkers read access to earlier calls in the same flow.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A [`ValidationSession`] is created for each request and owned by it. It
//! holds the calls already validated in the flow and the set of request
//! message identifiers seen so far. Nothing here is shared between requests,
//! so concurrent validations cannot observe each other.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde_json::Value;

use crate::model::ActionName;
use crate::model::CoreVersion;
use crate::model::DomainCode;
use crate::model::FlowId;

// ============================================================================
// SECTION: Prior Call
// ============================================================================

/// A call already validated within the session.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorCall {
    /// Dispatched action.
    pub action: ActionName,
    /// `payload.context` as received (`Null` when absent).
    pub context: Value,
    /// `payload.message` as received (`Null` when absent).
    pub message: Value,
    /// `context.timestamp`, when it was a string.
    pub timestamp: Option<String>,
}

impl PriorCall {
    /// Builds a history entry from a raw payload.
    #[must_use]
    pub fn from_payload(action: ActionName, payload: &Value) -> Self {
        let context = payload.get("context").cloned().unwrap_or(Value::Null);
        let message = payload.get("message").cloned().unwrap_or(Value::Null);
        let timestamp = context.get("timestamp").and_then(Value::as_str).map(str::to_string);
        Self {
            action,
            context,
            message,
            timestamp,
        }
    }

    /// Returns a string field of the recorded context.
    #[must_use]
    pub fn context_str(&self, field: &str) -> Option<&str> {
        self.context.get(field).and_then(Value::as_str)
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Sequence state for one validation request.
///
/// # Invariants
/// - `history` is append-only and ordered by validation order.
/// - `message_ids` is append-only.
#[derive(Debug, Clone)]
pub struct ValidationSession {
    /// Flow the calls belong to, when supplied.
    flow_id: Option<FlowId>,
    /// Protocol version fixed for the session.
    version: CoreVersion,
    /// Domain code fixed for the session.
    domain: DomainCode,
    /// When true, checkers skip comparisons against earlier calls.
    stateless: bool,
    /// Calls validated so far.
    history: Vec<PriorCall>,
    /// Request message identifiers seen so far.
    message_ids: BTreeSet<String>,
}

impl ValidationSession {
    /// Creates a stateless session for a single call.
    #[must_use]
    pub const fn new(version: CoreVersion, domain: DomainCode) -> Self {
        Self {
            flow_id: None,
            version,
            domain,
            stateless: true,
            history: Vec::new(),
            message_ids: BTreeSet::new(),
        }
    }

    /// Creates a stateful session for a whole flow.
    #[must_use]
    pub fn for_flow(flow_id: Option<FlowId>, version: CoreVersion, domain: DomainCode) -> Self {
        Self {
            flow_id,
            stateless: false,
            ..Self::new(version, domain)
        }
    }

    /// Overrides the stateless flag.
    #[must_use]
    pub const fn with_stateless(mut self, stateless: bool) -> Self {
        self.stateless = stateless;
        self
    }

    /// Returns the flow identifier.
    #[must_use]
    pub const fn flow_id(&self) -> Option<&FlowId> {
        self.flow_id.as_ref()
    }

    /// Returns the session protocol version.
    #[must_use]
    pub const fn version(&self) -> &CoreVersion {
        &self.version
    }

    /// Returns the session domain code.
    #[must_use]
    pub const fn domain(&self) -> &DomainCode {
        &self.domain
    }

    /// Returns true when cross-call checks should be skipped.
    #[must_use]
    pub const fn is_stateless(&self) -> bool {
        self.stateless
    }

    /// Returns the calls validated so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[PriorCall] {
        &self.history
    }

    /// Returns the first call of the flow.
    #[must_use]
    pub fn first_call(&self) -> Option<&PriorCall> {
        self.history.first()
    }

    /// Returns the most recent call of an action.
    #[must_use]
    pub fn last_call(&self, action: &str) -> Option<&PriorCall> {
        self.history.iter().rev().find(|call| call.action.as_str() == action)
    }

    /// Adds a message identifier; returns false when it was already present.
    pub fn register_message_id(&mut self, message_id: &str) -> bool {
        self.message_ids.insert(message_id.to_string())
    }

    /// Returns true when the message identifier was registered.
    #[must_use]
    pub fn has_message_id(&self, message_id: &str) -> bool {
        self.message_ids.contains(message_id)
    }

    /// Appends a validated call to the history.
    pub fn record(&mut self, call: PriorCall) {
        self.history.push(call);
    }
}
