// crates/conformance-rules/src/retail_v125/confirm.rs
// ============================================================================
// Module: Retail 1.2.5 Confirmation Checkers
// Description: Business rules for confirm and on_confirm.
// Purpose: Check payment against the quote and order identity across calls.
// Dependencies: conformance-core, serde_json
// ============================================================================

//! ## Overview
//! `confirm` must pay exactly the quoted total and keep the `on_init` quote.
//! `on_confirm` must report an order state from [`ON_CONFIRM_STATES`] and keep
//! the confirmed order id and quote.

// ============================================================================
// SECTION: Imports
// ============================================================================

use conformance_core::ActionCall;
use conformance_core::CheckerOutput;
use conformance_core::ValidationSession;

use crate::retail_v125::select::check_quote_breakup;
use crate::support::Findings;
use crate::support::amount;
use crate::support::check_context;
use crate::support::check_quote_matches;
use crate::support::check_same_str;
use crate::support::order_of;
use crate::support::quote_total;
use crate::support::str_at;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Order states a seller may report in `on_confirm`.
pub const ON_CONFIRM_STATES: [&str; 3] = ["Created", "Accepted", "In-progress"];

// ============================================================================
// SECTION: confirm
// ============================================================================

/// Checks a `confirm` request.
pub fn check_confirm(call: &ActionCall<'_>, session: &ValidationSession) -> CheckerOutput {
    let mut findings = Findings::default();
    check_context(call, session, &mut findings);
    let Some(order) = order_of(call.message()) else {
        return findings.bucketed();
    };
    check_quote_breakup(order, &mut findings);
    if let (Some(paid), Some(total)) =
        (amount(order.pointer("/payment/params/amount")), quote_total(order))
        && paid != total
    {
        findings.flag(
            "message.order.payment.params.amount",
            format!("payment amount {paid} does not match quote price {total}"),
        );
    }
    if !session.is_stateless() {
        let drafted = session.last_call("on_init").and_then(|call| order_of(Some(&call.message)));
        check_quote_matches(order, drafted, "on_init", &mut findings);
    }
    findings.bucketed()
}

// ============================================================================
// SECTION: on_confirm
// ============================================================================

/// Checks an `on_confirm` response.
pub fn check_on_confirm(call: &ActionCall<'_>, session: &ValidationSession) -> CheckerOutput {
    let mut findings = Findings::default();
    check_context(call, session, &mut findings);
    let Some(order) = order_of(call.message()) else {
        return findings.bucketed();
    };
    if let Some(state) = str_at(order, "/state")
        && !ON_CONFIRM_STATES.contains(&state)
    {
        findings.flag(
            "message.order.state",
            format!("order state {state} must be one of {}", ON_CONFIRM_STATES.join(", ")),
        );
    }
    if !session.is_stateless()
        && let Some(confirmed) =
            session.last_call("confirm").and_then(|call| order_of(Some(&call.message)))
    {
        check_same_str(
            "message.order.id",
            str_at(order, "/id"),
            str_at(confirmed, "/id"),
            "confirm",
            &mut findings,
        );
        check_quote_matches(order, Some(confirmed), "confirm", &mut findings);
    }
    findings.bucketed()
}
