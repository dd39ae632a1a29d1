// crates/conformance-rules/src/retail_v125/search.rs
// ============================================================================
// Module: Retail 1.2.5 Discovery Checkers
// Description: Business rules for search and on_search.
// Purpose: Check finder fee terms and catalog consistency.
// Dependencies: bigdecimal, conformance-core, serde_json
// ============================================================================

//! ## Overview
//! `on_search` has a generic checker and a food-and-beverage variant for
//! `RET11`, which additionally requires every item to declare whether it is
//! vegetarian.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use bigdecimal::BigDecimal;
use conformance_core::ActionCall;
use conformance_core::CheckerOutput;
use conformance_core::ValidationSession;
use serde_json::Value;

use crate::support::Findings;
use crate::support::amount;
use crate::support::array_at;
use crate::support::check_context;
use crate::support::ids;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Pointer to the buyer finder fee type.
const FEE_TYPE: &str = "/intent/payment/@ondc~1org~1buyer_app_finder_fee_type";
/// Pointer to the buyer finder fee amount.
const FEE_AMOUNT: &str = "/intent/payment/@ondc~1org~1buyer_app_finder_fee_amount";
/// Dotted path of the payment terms in a search message.
const PAYMENT_PATH: &str = "message.intent.payment";
/// Dotted path of the provider list in an on_search message.
const PROVIDERS_PATH: &str = "message.catalog.bpp/providers";
/// Tag code that marks an item as vegetarian or not.
const VEG_NONVEG_TAG: &str = "veg_nonveg";

// ============================================================================
// SECTION: search
// ============================================================================

/// Checks a `search` request.
pub fn check_search(call: &ActionCall<'_>, session: &ValidationSession) -> CheckerOutput {
    let mut findings = Findings::default();
    check_context(call, session, &mut findings);
    if let Some(message) = call.message() {
        check_finder_fee(message, &mut findings);
    }
    findings.bucketed()
}

/// Checks the buyer finder fee terms.
fn check_finder_fee(message: &Value, findings: &mut Findings) {
    let fee_type = message.pointer(FEE_TYPE).and_then(Value::as_str);
    let fee_path = format!("{PAYMENT_PATH}.@ondc/org/buyer_app_finder_fee_amount");
    if let Some(kind) = fee_type
        && kind != "percent"
        && kind != "amount"
    {
        findings.flag(
            format!("{PAYMENT_PATH}.@ondc/org/buyer_app_finder_fee_type"),
            "buyer_app_finder_fee_type must be percent or amount",
        );
    }
    let Some(raw) = message.pointer(FEE_AMOUNT) else {
        return;
    };
    match amount(Some(raw)) {
        None => findings.flag(fee_path, "buyer_app_finder_fee_amount must be numeric"),
        Some(value) if value < BigDecimal::from(0_i64) => {
            findings.flag(fee_path, "buyer_app_finder_fee_amount cannot be negative");
        }
        Some(value) if fee_type == Some("percent") && value > BigDecimal::from(100_i64) => {
            findings.flag(fee_path, "buyer_app_finder_fee_amount cannot exceed 100 percent");
        }
        Some(_) => {}
    }
}

// ============================================================================
// SECTION: on_search
// ============================================================================

/// Checks an `on_search` catalog.
pub fn check_on_search(call: &ActionCall<'_>, session: &ValidationSession) -> CheckerOutput {
    let mut findings = Findings::default();
    check_context(call, session, &mut findings);
    if let Some(message) = call.message() {
        check_catalog(message, &mut findings);
    }
    findings.bucketed()
}

/// Checks an `on_search` full catalog for `RET11` (food and beverage).
pub fn check_on_search_ret11(call: &ActionCall<'_>, session: &ValidationSession) -> CheckerOutput {
    let mut findings = Findings::default();
    check_context(call, session, &mut findings);
    if let Some(message) = call.message() {
        check_catalog(message, &mut findings);
        for (p, provider) in providers(message).iter().enumerate() {
            for (i, item) in array_at(provider, "/items").iter().enumerate() {
                if !has_tag(item, VEG_NONVEG_TAG) {
                    findings.flag(
                        format!("{PROVIDERS_PATH}[{p}].items[{i}].tags"),
                        "veg_nonveg tag is mandatory for F&B items",
                    );
                }
            }
        }
    }
    findings.bucketed()
}

/// Returns the catalog provider list.
fn providers(message: &Value) -> &[Value] {
    array_at(message, "/catalog/bpp~1providers")
}

/// Checks identifier uniqueness, prices, and references inside a catalog.
pub(crate) fn check_catalog(message: &Value, findings: &mut Findings) {
    let catalog_fulfillments = ids(array_at(message, "/catalog/bpp~1fulfillments"));
    let mut provider_ids = BTreeSet::new();
    for (p, provider) in providers(message).iter().enumerate() {
        let provider_path = format!("{PROVIDERS_PATH}[{p}]");
        if let Some(id) = provider.get("id").and_then(Value::as_str)
            && !provider_ids.insert(id)
        {
            findings.flag(format!("{provider_path}.id"), format!("provider id {id} is not unique"));
        }
        let mut fulfillments = ids(array_at(provider, "/fulfillments"));
        fulfillments.extend(catalog_fulfillments.iter().copied());
        let locations = ids(array_at(provider, "/locations"));
        let mut item_ids = BTreeSet::new();
        for (i, item) in array_at(provider, "/items").iter().enumerate() {
            let item_path = format!("{provider_path}.items[{i}]");
            if let Some(id) = item.get("id").and_then(Value::as_str)
                && !item_ids.insert(id)
            {
                findings.flag(format!("{item_path}.id"), format!("item id {id} is not unique"));
            }
            check_item_price(item, &item_path, findings);
            check_reference(item, "fulfillment_id", &fulfillments, &item_path, findings);
            check_reference(item, "location_id", &locations, &item_path, findings);
        }
    }
}

/// Checks an item price and its maximum.
fn check_item_price(item: &Value, item_path: &str, findings: &mut Findings) {
    let Some(price) = item.get("price") else {
        return;
    };
    let value = amount(price.get("value"));
    match value {
        None if price.get("value").is_some() => {
            findings.flag(format!("{item_path}.price.value"), "item price must be numeric");
        }
        Some(ref value) if *value < BigDecimal::from(0_i64) => {
            findings.flag(format!("{item_path}.price.value"), "item price cannot be negative");
        }
        _ => {}
    }
    if let (Some(value), Some(maximum)) = (value, amount(price.get("maximum_value")))
        && maximum < value
    {
        findings.flag(
            format!("{item_path}.price.maximum_value"),
            format!("maximum_value {maximum} cannot be less than price {value}"),
        );
    }
}

/// Checks that an item field names a declared identifier.
fn check_reference(
    item: &Value,
    field: &str,
    declared: &BTreeSet<&str>,
    item_path: &str,
    findings: &mut Findings,
) {
    if let Some(id) = item.get(field).and_then(Value::as_str)
        && !declared.contains(id)
    {
        findings.flag(format!("{item_path}.{field}"), format!("{field} {id} is not declared"));
    }
}

/// Returns true when a tagged object carries a tag group or list entry with `code`.
fn has_tag(item: &Value, code: &str) -> bool {
    array_at(item, "/tags").iter().any(|tag| {
        tag.get("code").and_then(Value::as_str) == Some(code)
            || array_at(tag, "/list")
                .iter()
                .any(|entry| entry.get("code").and_then(Value::as_str) == Some(code))
    })
}
