// crates/conformance-rules/tests/retail_flow.rs
// ============================================================================
// Module: Retail Flow Tests
// Description: Built-in retail catalog driven end to end.
// ============================================================================
//! ## Overview
//! Runs a complete, valid search-to-cancel transaction through the built-in
//! catalog, then breaks it one rule at a time and checks the reported path
//! and message.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use conformance_core::ActionName;
use conformance_core::CoreVersion;
use conformance_core::DefectKind;
use conformance_core::DispatchError;
use conformance_core::DomainCode;
use conformance_core::DomainFamily;
use conformance_core::FlowId;
use conformance_core::FlowReport;
use conformance_core::ValidationMode;
use conformance_core::ValidationOutcome;
use conformance_core::ValidationSession;
use conformance_core::select_errors;
use conformance_core::validate_flow;
use conformance_rules::Catalog;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const RETAIL_GROCERY: &str = "ONDC:RET10";

fn fixture() -> Map<String, Value> {
    serde_json::from_str(include_str!("fixtures/retail_flow.json")).expect("fixture parses")
}

fn run_flow(version: &str, flow: &Map<String, Value>) -> Result<FlowReport, DispatchError> {
    let catalog = Catalog::builtin().expect("catalog builds");
    let registry = catalog.actions(DomainFamily::Retail).expect("retail served");
    let version = CoreVersion::new(version);
    let domain = DomainCode::new(RETAIL_GROCERY);
    let mut session = ValidationSession::for_flow(
        Some(FlowId::new("flow-retail-1")),
        version.clone(),
        domain.clone(),
    );
    validate_flow(registry, &version, &domain, flow, &mut session)
}

fn run_single(domain: &str, action: &str, payload: &Value) -> ValidationOutcome {
    let catalog = Catalog::builtin().expect("catalog builds");
    let registry = catalog.actions(DomainFamily::Retail).expect("retail served");
    let version = CoreVersion::new("1.2.5");
    let domain = DomainCode::new(domain);
    let mut session = ValidationSession::new(version.clone(), domain.clone());
    registry
        .run_action(&version, &domain, &ActionName::new(action), payload, &mut session)
        .expect("action supported")
}

// ============================================================================
// SECTION: Clean Flow
// ============================================================================

#[test]
fn complete_flow_validates_clean() {
    let report = run_flow("1.2.5", &fixture()).expect("flow supported");
    let defects = report.defects(ValidationMode::Merged, None);
    assert!(defects.is_empty(), "unexpected defects: {}", serde_json::to_string(&defects).unwrap());
    let actions: Vec<&str> = report.outcomes().iter().map(|(action, _)| action.as_str()).collect();
    assert_eq!(
        actions,
        [
            "search",
            "on_search",
            "select",
            "on_select",
            "init",
            "on_init",
            "confirm",
            "on_confirm",
            "cancel",
            "on_cancel"
        ]
    );
}

#[test]
fn every_call_validates_clean_on_its_own() {
    for (action, payload) in fixture() {
        let outcome = run_single(RETAIL_GROCERY, &action, &payload);
        assert!(outcome.is_clean(), "{action}: {:?}", outcome.errors());
    }
}

// ============================================================================
// SECTION: Schema Rules
// ============================================================================

#[test]
fn wildcard_city_uses_the_action_message() {
    let mut flow = fixture();
    flow["on_search"]["context"]["city"] = json!("*");
    let outcome = run_single(RETAIL_GROCERY, "on_search", &flow["on_search"]);
    let merged = select_errors(&outcome, ValidationMode::Merged);
    assert_eq!(merged.get("context.city"), Some("City Code can't be * for on_search request"));
    assert_eq!(merged.len(), 1);
}

#[test]
fn missing_ttl_on_request_is_a_schema_defect() {
    let mut flow = fixture();
    flow["select"]["context"].as_object_mut().unwrap().remove("ttl");
    let outcome = run_single(RETAIL_GROCERY, "select", &flow["select"]);
    let schema = select_errors(&outcome, ValidationMode::SchemaOnly);
    assert_eq!(schema.get("context.ttl"), Some("required field missing"));
    assert!(select_errors(&outcome, ValidationMode::BusinessOnly).is_empty());
}

#[test]
fn non_object_flow_entry_is_reported_at_the_payload() {
    let mut flow = fixture();
    flow.insert("on_search".to_string(), json!(5));
    let report = run_flow("1.2.5", &flow).expect("flow supported");
    let defects = report.defects(ValidationMode::Merged, None);
    let on_search = defects.get("on_search").expect("on_search defects");
    assert_eq!(on_search.get("payload"), Some("must be object"));
    assert_eq!(on_search.get("context"), Some("context is required"));
}

// ============================================================================
// SECTION: Business Rules
// ============================================================================

#[test]
fn food_and_beverage_items_require_veg_nonveg_tag() {
    let flow = fixture();
    let outcome = run_single("ONDC:RET11", "on_search", &flow["on_search"]);
    let business = select_errors(&outcome, ValidationMode::BusinessOnly);
    let paths: Vec<&str> = business.iter().map(|(path, _)| path).collect();
    assert_eq!(
        paths,
        [
            "message.catalog.bpp/providers[0].items[0].tags",
            "message.catalog.bpp/providers[0].items[1].tags"
        ]
    );
    assert!(business.iter().all(|(_, message)| message == "veg_nonveg tag is mandatory for F&B items"));

    let grocery = run_single(RETAIL_GROCERY, "on_search", &flow["on_search"]);
    assert!(grocery.is_clean());
}

#[test]
fn veg_nonveg_tag_satisfies_the_food_variant() {
    let mut flow = fixture();
    for index in 0 .. 2 {
        flow["on_search"]["message"]["catalog"]["bpp/providers"][0]["items"][index]["tags"] =
            json!([{"code": "veg_nonveg", "list": [{"code": "veg", "value": "yes"}]}]);
    }
    let outcome = run_single("ONDC:RET11", "on_search", &flow["on_search"]);
    assert!(outcome.is_clean(), "{:?}", outcome.errors());
}

#[test]
fn quote_change_between_calls_is_reported() {
    let mut flow = fixture();
    let quote = &mut flow["on_init"]["message"]["order"]["quote"];
    quote["price"]["value"] = json!("310.00");
    quote["breakup"][2]["price"]["value"] = json!("50.00");
    let report = run_flow("1.2.5", &flow).expect("flow supported");
    let defects = report.defects(ValidationMode::Merged, None);

    let on_init = defects.get("on_init").expect("on_init defects");
    assert_eq!(
        on_init.get("message.order.quote.price.value"),
        Some("quote price 310.00 does not match on_select quote price 290.00")
    );
    let confirm = defects.get("confirm").expect("confirm defects");
    assert_eq!(
        confirm.get("message.order.quote.price.value"),
        Some("quote price 290.00 does not match on_init quote price 310.00")
    );
    assert!(defects.get("on_select").is_none());
}

#[test]
fn breakup_must_add_up_to_the_quote() {
    let mut flow = fixture();
    flow["on_select"]["message"]["order"]["quote"]["breakup"][0]["price"]["value"] =
        json!("210.00");
    let outcome = run_single(RETAIL_GROCERY, "on_select", &flow["on_select"]);
    let business = select_errors(&outcome, ValidationMode::BusinessOnly);
    assert_eq!(
        business.get("message.order.quote.price.value"),
        Some("quote price 290.00 does not match breakup total 300.00")
    );
}

#[test]
fn reused_request_message_id_is_flagged() {
    let mut flow = fixture();
    flow["init"]["context"]["message_id"] = json!("M-select");
    flow["on_init"]["context"]["message_id"] = json!("M-select");
    let report = run_flow("1.2.5", &flow).expect("flow supported");
    let defects = report.defects(ValidationMode::BusinessOnly, None);
    let init = defects.get("init").expect("init defects");
    assert_eq!(init.get("context.message_id"), Some("duplicate message id within flow"));
    assert_eq!(init.len(), 1);
    assert!(defects.get("on_init").is_none());
}

#[test]
fn callback_must_echo_the_request_transaction() {
    let mut flow = fixture();
    flow["on_select"]["context"]["transaction_id"] = json!("T-other");
    let report = run_flow("1.2.5", &flow).expect("flow supported");
    let defects = report.defects(ValidationMode::Merged, None);
    let on_select = defects.get("on_select").expect("on_select defects");
    assert_eq!(on_select.get("context.transaction_id"), Some("transaction_id must match select (T-7f3c2a)"));
}

#[test]
fn selection_must_come_from_the_catalog() {
    let mut flow = fixture();
    flow["select"]["message"]["order"]["items"][1]["id"] = json!("I9");
    let report = run_flow("1.2.5", &flow).expect("flow supported");
    let defects = report.defects(ValidationMode::BusinessOnly, None);
    let select = defects.get("select").expect("select defects");
    assert_eq!(
        select.get("message.order.items[1].id"),
        Some("item I9 was not offered by provider P1 in on_search")
    );
}

#[test]
fn unknown_cancellation_reason_is_flagged() {
    let mut flow = fixture();
    flow["cancel"]["message"]["cancellation_reason_id"] = json!("002");
    let report = run_flow("1.2.5", &flow).expect("flow supported");
    let defects = report.defects(ValidationMode::Merged, None);
    let cancel = defects.get("cancel").expect("cancel defects");
    assert_eq!(
        cancel.get("message.cancellation_reason_id"),
        Some("cancellation reason 002 is not a valid buyer reason")
    );
}

#[test]
fn defect_limit_caps_paths_per_action() {
    let mut flow = fixture();
    for index in 0 .. 2 {
        flow["select"]["message"]["order"]["items"][index]["quantity"]["count"] = json!(0);
    }
    let report = run_flow("1.2.5", &flow).expect("flow supported");
    let capped = report.defects(ValidationMode::BusinessOnly, Some(1));
    assert_eq!(capped.get("select").map(conformance_core::DefectMap::len), Some(1));
    let full = report.defects(ValidationMode::BusinessOnly, None);
    assert_eq!(full.get("select").map(conformance_core::DefectMap::len), Some(2));
}

#[test]
fn one_paisa_quote_difference_is_not_ignored() {
    let mut flow = fixture();
    flow["on_select"]["message"]["order"]["quote"]["price"]["value"] = json!("290.01");
    let outcome = run_single(RETAIL_GROCERY, "on_select", &flow["on_select"]);
    let business = select_errors(&outcome, ValidationMode::BusinessOnly);
    assert_eq!(
        business.get("message.order.quote.price.value"),
        Some("quote price 290.01 does not match breakup total 290.00")
    );
}

#[test]
fn equal_amounts_with_different_precision_match() {
    let mut flow = fixture();
    flow["on_select"]["message"]["order"]["quote"]["price"]["value"] = json!("290");
    flow["on_select"]["message"]["order"]["quote"]["breakup"][2]["price"]["value"] = json!(30);
    let outcome = run_single(RETAIL_GROCERY, "on_select", &flow["on_select"]);
    assert!(select_errors(&outcome, ValidationMode::BusinessOnly).is_empty());
}

#[test]
fn init_must_keep_the_selection() {
    let mut flow = fixture();
    let order = &mut flow["init"]["message"]["order"];
    order["provider"]["id"] = json!("P2");
    order["items"][1]["id"] = json!("I3");
    let report = run_flow("1.2.5", &flow).expect("flow supported");
    let defects = report.defects(ValidationMode::BusinessOnly, None);
    let init = defects.get("init").expect("init defects");
    assert_eq!(init.get("message.order.provider.id"), Some("message.order.provider.id must match select (P1)"));
    assert_eq!(init.get("message.order.items[1].id"), Some("item I3 was not part of select"));
    assert_eq!(init.get("message.order.items"), Some("selected item I2 is missing from init"));
    assert_eq!(init.len(), 3);
}

#[test]
fn init_requires_billing() {
    let mut flow = fixture();
    flow["init"]["message"]["order"].as_object_mut().unwrap().remove("billing");
    let outcome = run_single(RETAIL_GROCERY, "init", &flow["init"]);
    let business = select_errors(&outcome, ValidationMode::BusinessOnly);
    assert_eq!(business.get("message.order.billing"), Some("billing details are required in init"));
    let schema = select_errors(&outcome, ValidationMode::SchemaOnly);
    assert_eq!(schema.get("message.order.billing"), Some("required field missing"));
}

#[test]
fn confirm_payment_must_equal_the_quote() {
    let mut flow = fixture();
    flow["confirm"]["message"]["order"]["payment"]["params"]["amount"] = json!("289.99");
    let report = run_flow("1.2.5", &flow).expect("flow supported");
    let defects = report.defects(ValidationMode::BusinessOnly, None);
    let confirm = defects.get("confirm").expect("confirm defects");
    assert_eq!(
        confirm.get("message.order.payment.params.amount"),
        Some("payment amount 289.99 does not match quote price 290.00")
    );
    assert_eq!(confirm.len(), 1);
}

#[test]
fn on_confirm_state_must_be_an_open_order_state() {
    let mut flow = fixture();
    flow["on_confirm"]["message"]["order"]["state"] = json!("Completed");
    let report = run_flow("1.2.5", &flow).expect("flow supported");
    let defects = report.defects(ValidationMode::BusinessOnly, None);
    let on_confirm = defects.get("on_confirm").expect("on_confirm defects");
    assert_eq!(
        on_confirm.get("message.order.state"),
        Some("order state Completed must be one of Created, Accepted, In-progress")
    );
}

#[test]
fn on_confirm_must_keep_the_confirmed_order_id() {
    let mut flow = fixture();
    flow["on_confirm"]["message"]["order"]["id"] = json!("O-2002");
    let report = run_flow("1.2.5", &flow).expect("flow supported");
    let defects = report.defects(ValidationMode::BusinessOnly, None);
    let on_confirm = defects.get("on_confirm").expect("on_confirm defects");
    assert_eq!(on_confirm.get("message.order.id"), Some("message.order.id must match confirm (O-1001)"));
    let cancel = defects.get("cancel").expect("cancel defects");
    assert_eq!(cancel.get("message.order_id"), Some("message.order_id must match on_confirm (O-2002)"));
}

#[test]
fn on_cancel_must_report_the_cancelled_order() {
    let mut flow = fixture();
    let order = &mut flow["on_cancel"]["message"]["order"];
    order["state"] = json!("Accepted");
    order["id"] = json!("O-9");
    let report = run_flow("1.2.5", &flow).expect("flow supported");
    let defects = report.defects(ValidationMode::BusinessOnly, None);
    let on_cancel = defects.get("on_cancel").expect("on_cancel defects");
    assert_eq!(on_cancel.get("message.order.state"), Some("order state must be Cancelled, found Accepted"));
    assert_eq!(on_cancel.get("message.order.id"), Some("message.order.id must match cancel (O-1001)"));
    assert_eq!(on_cancel.len(), 2);
}

// ============================================================================
// SECTION: Versions
// ============================================================================

#[test]
fn older_version_reports_one_flat_list() {
    let mut flow = fixture();
    flow.retain(|action, _| action == "search" || action == "on_search");
    for payload in flow.values_mut() {
        payload["context"]["core_version"] = json!("1.2.0");
    }
    let clean = run_flow("1.2.0", &flow).expect("flow supported");
    assert!(clean.is_clean());

    flow["on_search"]["context"]["city"] = json!("*");
    flow["on_search"]["message"]["catalog"]["bpp/providers"][0]["items"][1]["price"]["value"] =
        json!("-5.00");
    let report = run_flow("1.2.0", &flow).expect("flow supported");
    let (_, outcome) = &report.outcomes()[1];
    assert!(!outcome.is_bucketed());
    let kinds: Vec<DefectKind> = outcome.errors().iter().map(|error| error.kind).collect();
    assert_eq!(kinds, [DefectKind::SchemaDefect, DefectKind::BusinessDefect]);
    let business = select_errors(outcome, ValidationMode::BusinessOnly);
    assert_eq!(
        business.get("message.catalog.bpp/providers[0].items[1].price.value"),
        Some("item price cannot be negative")
    );
}

#[test]
fn unsupported_version_and_action_fail_the_flow() {
    let flow = fixture();
    assert!(matches!(run_flow("1.1.0", &flow), Err(DispatchError::UnsupportedVersion(_))));

    let mut with_track = fixture();
    with_track.insert("track".to_string(), json!({"context": {"action": "track"}}));
    match run_flow("1.2.5", &with_track) {
        Err(DispatchError::UnsupportedAction {
            action, ..
        }) => assert_eq!(action.as_str(), "track"),
        other => panic!("expected unsupported action, got {other:?}"),
    }
}
