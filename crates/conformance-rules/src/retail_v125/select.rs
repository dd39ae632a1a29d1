// crates/conformance-rules/src/retail_v125/select.rs
// ============================================================================
// Module: Retail 1.2.5 Selection Checkers
// Description: Business rules for select and on_select.
// Purpose: Tie selections to the catalog and quotes to their breakup.
// Dependencies: conformance-core, serde_json
// ============================================================================

//! ## Overview
//! `select` must name a provider and items offered in the flow's latest
//! `on_search`, with positive integer quantities. `on_select` must quote a
//! total equal to its breakup and keep the selected provider and items.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use conformance_core::ActionCall;
use conformance_core::CheckerOutput;
use conformance_core::ValidationSession;
use serde_json::Value;

use crate::support::Findings;
use crate::support::array_at;
use crate::support::breakup_total;
use crate::support::check_context;
use crate::support::check_same_str;
use crate::support::ids;
use crate::support::order_of;
use crate::support::quote_total;
use crate::support::str_at;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Dotted path of the order inside a message.
const ORDER_PATH: &str = "message.order";

// ============================================================================
// SECTION: select
// ============================================================================

/// Checks a `select` request.
pub fn check_select(call: &ActionCall<'_>, session: &ValidationSession) -> CheckerOutput {
    let mut findings = Findings::default();
    check_context(call, session, &mut findings);
    let Some(order) = order_of(call.message()) else {
        return findings.bucketed();
    };
    for (i, item) in array_at(order, "/items").iter().enumerate() {
        let count = item.pointer("/quantity/count");
        if count.is_some() && !count.and_then(Value::as_u64).is_some_and(|count| count > 0) {
            findings.flag(
                format!("{ORDER_PATH}.items[{i}].quantity.count"),
                "quantity count must be a positive integer",
            );
        }
    }
    if !session.is_stateless()
        && let Some(catalog) = session.last_call("on_search")
    {
        check_against_catalog(order, &catalog.message, &mut findings);
    }
    findings.bucketed()
}

/// Checks that the selected provider and items were offered in the catalog.
fn check_against_catalog(order: &Value, catalog: &Value, findings: &mut Findings) {
    let Some(provider_id) = str_at(order, "/provider/id") else {
        return;
    };
    let offered = array_at(catalog, "/catalog/bpp~1providers")
        .iter()
        .find(|provider| provider.get("id").and_then(Value::as_str) == Some(provider_id));
    let Some(provider) = offered else {
        findings.flag(
            format!("{ORDER_PATH}.provider.id"),
            format!("provider {provider_id} was not offered in on_search"),
        );
        return;
    };
    let offered_items = ids(array_at(provider, "/items"));
    for (i, item) in array_at(order, "/items").iter().enumerate() {
        if let Some(id) = item.get("id").and_then(Value::as_str)
            && !offered_items.contains(id)
        {
            findings.flag(
                format!("{ORDER_PATH}.items[{i}].id"),
                format!("item {id} was not offered by provider {provider_id} in on_search"),
            );
        }
    }
}

// ============================================================================
// SECTION: on_select
// ============================================================================

/// Checks an `on_select` quote.
pub fn check_on_select(call: &ActionCall<'_>, session: &ValidationSession) -> CheckerOutput {
    let mut findings = Findings::default();
    check_context(call, session, &mut findings);
    let Some(order) = order_of(call.message()) else {
        return findings.bucketed();
    };
    check_quote_breakup(order, &mut findings);

    let selected = if session.is_stateless() {
        None
    } else {
        session.last_call("select").and_then(|call| order_of(Some(&call.message)))
    };
    if let Some(selected) = selected {
        check_same_str(
            "message.order.provider.id",
            str_at(order, "/provider/id"),
            str_at(selected, "/provider/id"),
            "select",
            &mut findings,
        );
    }
    let known_items = ids(array_at(selected.unwrap_or(order), "/items"));
    check_breakup_items(order, &known_items, &mut findings);
    findings.bucketed()
}

/// Checks that the quoted total equals the sum of its breakup.
pub(crate) fn check_quote_breakup(order: &Value, findings: &mut Findings) {
    if let (Some(total), Some(sum)) = (quote_total(order), breakup_total(order))
        && total != sum
    {
        findings.flag(
            format!("{ORDER_PATH}.quote.price.value"),
            format!("quote price {total} does not match breakup total {sum}"),
        );
    }
}

/// Checks that item breakup lines reference known items.
fn check_breakup_items(order: &Value, known_items: &BTreeSet<&str>, findings: &mut Findings) {
    for (k, entry) in array_at(order, "/quote/breakup").iter().enumerate() {
        if str_at(entry, "/@ondc~1org~1title_type") != Some("item") {
            continue;
        }
        if let Some(id) = str_at(entry, "/@ondc~1org~1item_id")
            && !known_items.contains(id)
        {
            findings.flag(
                format!("{ORDER_PATH}.quote.breakup[{k}].@ondc/org/item_id"),
                format!("breakup item {id} was not selected"),
            );
        }
    }
}
