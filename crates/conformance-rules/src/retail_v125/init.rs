// crates/conformance-rules/src/retail_v125/init.rs
// ============================================================================
// Module: Retail 1.2.5 Initialization Checkers
// Description: Business rules for init and on_init.
// Purpose: Keep the order draft consistent with the accepted selection.
// Dependencies: conformance-core, serde_json
// ============================================================================

//! ## Overview
//! `init` must carry billing details and keep the provider and items of the
//! selection. `on_init` must keep the `on_select` quote.

// ============================================================================
// SECTION: Imports
// ============================================================================

use conformance_core::ActionCall;
use conformance_core::CheckerOutput;
use conformance_core::ValidationSession;
use serde_json::Value;

use crate::retail_v125::select::check_quote_breakup;
use crate::support::Findings;
use crate::support::array_at;
use crate::support::check_context;
use crate::support::check_quote_matches;
use crate::support::check_same_str;
use crate::support::ids;
use crate::support::order_of;
use crate::support::str_at;

// ============================================================================
// SECTION: init
// ============================================================================

/// Checks an `init` request.
pub fn check_init(call: &ActionCall<'_>, session: &ValidationSession) -> CheckerOutput {
    let mut findings = Findings::default();
    check_context(call, session, &mut findings);
    let Some(order) = order_of(call.message()) else {
        return findings.bucketed();
    };
    if order.get("billing").is_none_or(|billing| !billing.is_object()) {
        findings.flag("message.order.billing", "billing details are required in init");
    }
    if !session.is_stateless()
        && let Some(selected) = session.last_call("select").and_then(|call| order_of(Some(&call.message)))
    {
        check_matches_selection(order, selected, &mut findings);
    }
    findings.bucketed()
}

/// Checks provider and item identifiers against the selection.
fn check_matches_selection(order: &Value, selected: &Value, findings: &mut Findings) {
    check_same_str(
        "message.order.provider.id",
        str_at(order, "/provider/id"),
        str_at(selected, "/provider/id"),
        "select",
        findings,
    );
    let selected_items = ids(array_at(selected, "/items"));
    for (i, item) in array_at(order, "/items").iter().enumerate() {
        if let Some(id) = item.get("id").and_then(Value::as_str)
            && !selected_items.contains(id)
        {
            findings.flag(
                format!("message.order.items[{i}].id"),
                format!("item {id} was not part of select"),
            );
        }
    }
    let current_items = ids(array_at(order, "/items"));
    for missing in selected_items.difference(&current_items) {
        findings.flag("message.order.items", format!("selected item {missing} is missing from init"));
    }
}

// ============================================================================
// SECTION: on_init
// ============================================================================

/// Checks an `on_init` response.
pub fn check_on_init(call: &ActionCall<'_>, session: &ValidationSession) -> CheckerOutput {
    let mut findings = Findings::default();
    check_context(call, session, &mut findings);
    let Some(order) = order_of(call.message()) else {
        return findings.bucketed();
    };
    check_quote_breakup(order, &mut findings);
    if !session.is_stateless() {
        let quoted = session.last_call("on_select").and_then(|call| order_of(Some(&call.message)));
        check_quote_matches(order, quoted, "on_select", &mut findings);
    }
    findings.bucketed()
}
