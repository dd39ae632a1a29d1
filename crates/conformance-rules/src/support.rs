// crates/conformance-rules/src/support.rs
// ============================================================================
// Module: Checker Support
// Description: Shared helpers for retail business checkers.
// Purpose: Context checks, callback pairing, and amount arithmetic.
// Dependencies: bigdecimal, conformance-core, serde_json
// ============================================================================

//! ## Overview
//! Every checker starts with [`check_context`], which covers the rules common
//! to all actions, then adds its own message rules. Amounts arrive as decimal
//! strings or numbers and are compared exactly as [`BigDecimal`] values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use conformance_core::ActionCall;
use conformance_core::CheckerOutput;
use conformance_core::ValidationError;
use conformance_core::ValidationSession;
use conformance_core::model::clock::parse_timestamp;
use conformance_core::schema::Format;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest decimal exponent accepted in an amount, either direction.
const MAX_AMOUNT_SCALE: i64 = 32;

/// Context fields a callback must copy from its request.
const PAIRED_CONTEXT_FIELDS: [&str; 4] = ["transaction_id", "message_id", "bap_id", "bpp_id"];

// ============================================================================
// SECTION: Findings
// ============================================================================

/// Business defects collected by one checker run.
#[derive(Debug, Default)]
pub struct Findings {
    /// Defects in discovery order.
    defects: Vec<ValidationError>,
}

impl Findings {
    /// Records a business defect.
    pub fn flag(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.defects.push(ValidationError::business(path, message));
    }

    /// Finishes a checker whose schema defects come from the schema engine.
    pub fn bucketed(self) -> CheckerOutput {
        CheckerOutput::Bucketed {
            schema: Vec::new(),
            business: self.defects,
        }
    }

    /// Finishes a checker that reports one undivided list.
    pub fn flat(self) -> CheckerOutput {
        CheckerOutput::Flat(self.defects)
    }
}

// ============================================================================
// SECTION: Context Rules
// ============================================================================

/// Applies the rules shared by every action.
pub fn check_context(call: &ActionCall<'_>, session: &ValidationSession, findings: &mut Findings) {
    if !call.context().is_some_and(Value::is_object) {
        findings.flag("context", "context is required");
        return;
    }
    let action = call.action.as_str();
    if call.context_str("action").is_some_and(|found| found != action) {
        findings.flag("context.action", format!("context.action must be {action}"));
    }
    let version = call.version.as_str();
    if call.context_str("core_version").is_some_and(|found| found != version) {
        findings.flag("context.core_version", format!("context.core_version must be {version}"));
    }
    if let Some(timestamp) = call.context_str("timestamp")
        && parse_timestamp(timestamp).is_none()
    {
        findings.flag("context.timestamp", "Time must be RFC3339 UTC timestamp format.");
    }
    if let Some(ttl) = call.context_str("ttl")
        && !Format::Duration.is_valid(ttl)
    {
        findings.flag("context.ttl", "Duration must be RFC3339 duration.");
    }
    if session.is_stateless() {
        return;
    }
    if call.action.is_callback() {
        check_callback_pairing(call, session, findings);
    } else if let Some(first) = session.first_call()
        && let (Some(expected), Some(found)) =
            (first.context_str("transaction_id"), call.context_str("transaction_id"))
        && expected != found
    {
        findings.flag(
            "context.transaction_id",
            format!("transaction_id must match {} ({expected})", first.action),
        );
    }
}

/// Compares a callback's context with the request it answers.
fn check_callback_pairing(
    call: &ActionCall<'_>,
    session: &ValidationSession,
    findings: &mut Findings,
) {
    let Some(request_action) = call.action.request_action() else {
        return;
    };
    let Some(request) = session.last_call(request_action.as_str()) else {
        return;
    };
    for field in PAIRED_CONTEXT_FIELDS {
        if let (Some(expected), Some(found)) = (request.context_str(field), call.context_str(field))
            && expected != found
        {
            findings.flag(
                format!("context.{field}"),
                format!("{field} must match {request_action} ({expected})"),
            );
        }
    }
    let request_time = request.timestamp.as_deref().and_then(parse_timestamp);
    let callback_time = call.context_str("timestamp").and_then(parse_timestamp);
    if let (Some(request_time), Some(callback_time)) = (request_time, callback_time)
        && callback_time < request_time
    {
        findings.flag(
            "context.timestamp",
            format!("{} timestamp cannot be earlier than {request_action} timestamp", call.action),
        );
    }
}

// ============================================================================
// SECTION: Value Access
// ============================================================================

/// Returns `message.order` of a payload or prior message.
pub fn order_of(message: Option<&Value>) -> Option<&Value> {
    message.and_then(|message| message.get("order"))
}

/// Returns a string at a JSON pointer.
pub fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

/// Returns the array at a JSON pointer, or an empty slice.
pub fn array_at<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    value.pointer(pointer).and_then(Value::as_array).map_or(&[], Vec::as_slice)
}

/// Collects the `id` of every element of an array.
pub fn ids(elements: &[Value]) -> BTreeSet<&str> {
    elements.iter().filter_map(|element| element.get("id").and_then(Value::as_str)).collect()
}

// ============================================================================
// SECTION: Amounts
// ============================================================================

/// Parses a decimal amount given as a string or a number.
///
/// Amounts with an exponent beyond [`MAX_AMOUNT_SCALE`] are rejected so that
/// comparisons never rescale to absurd precision.
pub fn amount(value: Option<&Value>) -> Option<BigDecimal> {
    let parsed = match value? {
        Value::String(text) => BigDecimal::from_str(text.trim()).ok()?,
        Value::Number(number) => BigDecimal::from_str(&number.to_string()).ok()?,
        _ => return None,
    };
    let (_, scale) = parsed.as_bigint_and_exponent();
    (-MAX_AMOUNT_SCALE..=MAX_AMOUNT_SCALE).contains(&scale).then_some(parsed)
}

/// Returns the quoted order total.
pub fn quote_total(order: &Value) -> Option<BigDecimal> {
    amount(order.pointer("/quote/price/value"))
}

/// Sums the breakup prices of an order quote.
pub fn breakup_total(order: &Value) -> Option<BigDecimal> {
    let breakup = order.pointer("/quote/breakup")?.as_array()?;
    let mut total = BigDecimal::from(0_i64);
    for entry in breakup {
        total += amount(entry.pointer("/price/value"))?;
    }
    Some(total)
}

/// Flags a quote total that differs from an earlier call's total.
pub fn check_quote_matches(
    order: &Value,
    prior: Option<&Value>,
    prior_action: &str,
    findings: &mut Findings,
) {
    let (Some(current), Some(expected)) = (quote_total(order), prior.and_then(quote_total)) else {
        return;
    };
    if current != expected {
        findings.flag(
            "message.order.quote.price.value",
            format!("quote price {current} does not match {prior_action} quote price {expected}"),
        );
    }
}

/// Flags an order field that differs from an earlier call.
pub fn check_same_str(
    path: &str,
    current: Option<&str>,
    expected: Option<&str>,
    prior_action: &str,
    findings: &mut Findings,
) {
    if let (Some(current), Some(expected)) = (current, expected)
        && current != expected
    {
        findings.flag(path, format!("{path} must match {prior_action} ({expected})"));
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
