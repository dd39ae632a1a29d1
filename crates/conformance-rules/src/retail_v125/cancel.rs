// crates/conformance-rules/src/retail_v125/cancel.rs
// ============================================================================
// Module: Retail 1.2.5 Cancellation Checkers
// Description: Business rules for cancel and on_cancel.
// Purpose: Check reason codes and the cancelled order identity.
// Dependencies: conformance-core
// ============================================================================

//! ## Overview
//! `cancel` must use a reason from [`BUYER_CANCELLATION_REASONS`] and name the
//! confirmed order. `on_cancel` must report the order as cancelled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use conformance_core::ActionCall;
use conformance_core::CheckerOutput;
use conformance_core::ValidationSession;

use crate::support::Findings;
use crate::support::check_context;
use crate::support::check_same_str;
use crate::support::order_of;
use crate::support::str_at;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Cancellation reason codes a buyer app may send.
pub const BUYER_CANCELLATION_REASONS: [&str; 6] = ["001", "003", "006", "009", "010", "012"];

/// Order state required in `on_cancel`.
const CANCELLED: &str = "Cancelled";

// ============================================================================
// SECTION: cancel
// ============================================================================

/// Checks a `cancel` request.
pub fn check_cancel(call: &ActionCall<'_>, session: &ValidationSession) -> CheckerOutput {
    let mut findings = Findings::default();
    check_context(call, session, &mut findings);
    let Some(message) = call.message() else {
        return findings.bucketed();
    };
    if let Some(reason) = str_at(message, "/cancellation_reason_id")
        && !BUYER_CANCELLATION_REASONS.contains(&reason)
    {
        findings.flag(
            "message.cancellation_reason_id",
            format!("cancellation reason {reason} is not a valid buyer reason"),
        );
    }
    if !session.is_stateless()
        && let Some(confirmed) =
            session.last_call("on_confirm").and_then(|call| order_of(Some(&call.message)))
    {
        check_same_str(
            "message.order_id",
            str_at(message, "/order_id"),
            str_at(confirmed, "/id"),
            "on_confirm",
            &mut findings,
        );
    }
    findings.bucketed()
}

// ============================================================================
// SECTION: on_cancel
// ============================================================================

/// Checks an `on_cancel` response.
pub fn check_on_cancel(call: &ActionCall<'_>, session: &ValidationSession) -> CheckerOutput {
    let mut findings = Findings::default();
    check_context(call, session, &mut findings);
    let Some(order) = order_of(call.message()) else {
        return findings.bucketed();
    };
    if let Some(state) = str_at(order, "/state")
        && state != CANCELLED
    {
        findings.flag("message.order.state", format!("order state must be {CANCELLED}, found {state}"));
    }
    if !session.is_stateless()
        && let Some(cancel) = session.last_call("cancel")
    {
        check_same_str(
            "message.order.id",
            str_at(order, "/id"),
            str_at(&cancel.message, "/order_id"),
            "cancel",
            &mut findings,
        );
    }
    findings.bucketed()
}
