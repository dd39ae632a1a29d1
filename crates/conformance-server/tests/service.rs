// crates/conformance-server/tests/service.rs
// ============================================================================
// Module: Conformance Service Tests
// Description: Service operations without a transport.
// ============================================================================
//! ## Overview
//! Drives [`ConformanceService`] directly: signed flow reports and their
//! re-verification, single-action validation modes, schema lookup, and
//! signer failures.

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

mod common;

use std::sync::Arc;
use std::time::Duration;

use conformance_core::DispatchError;
use conformance_core::LocalSigner;
use conformance_core::verify_report;
use conformance_server::NoopAuditSink;
use conformance_server::ServiceError;
use conformance_server::ServiceSettings;
use conformance_server::service::FLOW_FAILED;
use conformance_server::service::FLOW_VERIFIED;
use conformance_server::service::SIGNATURE_INVALID;
use conformance_server::service::SIGNATURE_VERIFIED;
use serde_json::Value;
use serde_json::json;

use crate::common::OfflineSigner;
use crate::common::RETAIL_GROCERY;
use crate::common::RecordingSink;
use crate::common::SlowSigner;
use crate::common::fixture_flow;
use crate::common::local_service;
use crate::common::service_with;
use crate::common::signing_key;
use crate::common::validate_body;

fn body_bytes(body: &Value) -> Vec<u8> {
    serde_json::to_vec(body).expect("body serializes")
}

fn single_action(payload: &Value) -> Value {
    json!({"payload": payload, "flow": "retail-1", "stateless": true})
}

// ============================================================================
// SECTION: Validate
// ============================================================================

#[tokio::test]
async fn clean_flow_is_signed_and_verifies() {
    let sink = Arc::new(RecordingSink::default());
    let service = local_service(sink.clone());
    let result =
        service.validate("retail", &body_bytes(&validate_body(fixture_flow()))).await.unwrap();

    assert!(result.signed.success);
    assert_eq!(result.signed.response.message.as_deref(), Some(FLOW_VERIFIED));
    assert!(result.signed.response.report.is_none());
    assert_eq!(result.signed.response.domain.as_deref(), Some(RETAIL_GROCERY));
    assert_eq!(result.signed.response.bap_id.as_deref(), Some("buyer.example.com"));
    assert_eq!(result.signed.response.payload, fixture_flow());

    let key = signing_key().verifying_key();
    let verified = verify_report(
        &result.signed.response,
        &result.signed.signature,
        &result.signed.sign_timestamp,
        &key,
    )
    .unwrap();
    assert!(verified);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event"], "report_attested");
    assert_eq!(events[0]["report_hash"], result.digest.as_hex());
    assert_eq!(events[0]["success"], true);
}

#[tokio::test]
async fn defective_flow_is_signed_with_its_report() {
    let service = local_service(Arc::new(NoopAuditSink));
    let mut flow = fixture_flow();
    flow["on_search"]["context"]["city"] = json!("*");
    let result = service.validate("RETAIL", &body_bytes(&validate_body(flow))).await.unwrap();

    assert!(!result.signed.success);
    assert_eq!(result.signed.response.message.as_deref(), Some(FLOW_FAILED));
    let report = result.signed.response.report.as_ref().expect("report present");
    assert!(report["on_search"]["context.city"].is_string());
    assert!(report.get("search").is_none());
}

#[tokio::test]
async fn defect_limit_applies_to_flow_reports() {
    let settings = ServiceSettings {
        max_reported_defects: Some(1),
        ..ServiceSettings::default()
    };
    let service =
        service_with(Arc::new(LocalSigner::new(signing_key())), settings, Arc::new(NoopAuditSink));
    let mut flow = fixture_flow();
    for index in 0 .. 2 {
        flow["select"]["message"]["order"]["items"][index]["quantity"]["count"] = json!(0);
    }
    let result = service.validate("retail", &body_bytes(&validate_body(flow))).await.unwrap();
    let report = result.signed.response.report.expect("report present");
    assert_eq!(report["select"].as_object().map(serde_json::Map::len), Some(1));
}

#[tokio::test]
async fn usage_faults_produce_no_report() {
    let service = local_service(Arc::new(NoopAuditSink));
    let body = body_bytes(&validate_body(fixture_flow()));

    let err = service.validate("igm", &body).await.unwrap_err();
    assert!(matches!(err, ServiceError::UnsupportedDomain(ref segment) if segment == "igm"));
    let err = service.validate("grocery", &body).await.unwrap_err();
    assert_eq!(err.kind(), "unsupported_domain");

    let mut request = validate_body(fixture_flow());
    request["version"] = json!("1.1.0");
    let err = service.validate("retail", &body_bytes(&request)).await.unwrap_err();
    assert!(matches!(err, ServiceError::Dispatch(DispatchError::UnsupportedVersion(_))));

    let mut flow = fixture_flow();
    flow["track"] = flow["search"].clone();
    let err = service.validate("retail", &body_bytes(&validate_body(flow))).await.unwrap_err();
    assert_eq!(err.kind(), "unsupported_action");

    let err = service.validate("retail", br#"{"domain":"ONDC:RET10"}"#).await.unwrap_err();
    assert_eq!(err.to_string(), "domain, version, payload are required");
    let err = service.validate("retail", b"not json").await.unwrap_err();
    assert_eq!(err.kind(), "malformed_request");
}

#[tokio::test]
async fn body_domain_must_belong_to_the_route_family() {
    let sink = Arc::new(RecordingSink::default());
    let service = local_service(sink.clone());
    let mut request = validate_body(fixture_flow());
    request["domain"] = json!("ONDC:LOG10");
    let err = service.validate("retail", &body_bytes(&request)).await.unwrap_err();
    assert_eq!(err.kind(), "unsupported_domain");
    assert_eq!(err.to_string(), "domain not supported: ONDC:LOG10 for retail");

    request["domain"] = json!("ONDC:XYZ10");
    let err = service.validate("retail", &body_bytes(&request)).await.unwrap_err();
    assert_eq!(err.kind(), "unsupported_domain");
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn stalled_signer_times_out_as_unavailable() {
    let settings = ServiceSettings {
        sign_timeout: Duration::from_millis(50),
        ..ServiceSettings::default()
    };
    let signer = SlowSigner {
        inner: LocalSigner::new(signing_key()),
        delay: Duration::from_millis(500),
    };
    let service = service_with(Arc::new(signer), settings, Arc::new(NoopAuditSink));
    let err = service
        .validate("retail", &body_bytes(&validate_body(fixture_flow())))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::SignerUnavailable(_)));
}

#[tokio::test]
async fn offline_signer_is_unavailable() {
    let signer = OfflineSigner {
        key: signing_key().verifying_key(),
    };
    let service = service_with(Arc::new(signer), ServiceSettings::default(), Arc::new(NoopAuditSink));
    let err = service
        .validate("retail", &body_bytes(&validate_body(fixture_flow())))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "signer_unavailable");
}

// ============================================================================
// SECTION: Validate Token
// ============================================================================

#[tokio::test]
async fn token_round_trip_detects_tampering() {
    let service = local_service(Arc::new(NoopAuditSink));
    let result =
        service.validate("retail", &body_bytes(&validate_body(fixture_flow()))).await.unwrap();
    let mut token = serde_json::to_value(&result.signed).unwrap();

    let verdict = service.validate_token(&token).unwrap();
    assert!(verdict.verified);
    assert_eq!(verdict.message, SIGNATURE_VERIFIED);

    token["response"]["payload"]["search"]["context"]["city"] = json!("std:011");
    let verdict = service.validate_token(&token).unwrap();
    assert!(!verdict.verified);
    assert_eq!(verdict.message, SIGNATURE_INVALID);
}

#[tokio::test]
async fn malformed_tokens_are_rejected_before_verification() {
    let service = local_service(Arc::new(NoopAuditSink));
    let result =
        service.validate("retail", &body_bytes(&validate_body(fixture_flow()))).await.unwrap();
    let token = serde_json::to_value(&result.signed).unwrap();

    for field in ["signature", "signTimestamp", "response", "success"] {
        let mut broken = token.clone();
        broken.as_object_mut().unwrap().remove(field);
        let err = service.validate_token(&broken).unwrap_err();
        assert_eq!(err.kind(), "verification", "missing {field}");
    }

    let mut no_payload = token.clone();
    no_payload["response"].as_object_mut().unwrap().remove("payload");
    assert!(service.validate_token(&no_payload).is_err());

    let mut bad_signature = token;
    bad_signature["signature"] = json!("not-base64!!");
    assert_eq!(service.validate_token(&bad_signature).unwrap_err().kind(), "verification");
}

// ============================================================================
// SECTION: Single Action
// ============================================================================

#[test]
fn clean_single_action_has_no_defects() {
    let service = local_service(Arc::new(NoopAuditSink));
    let flow = fixture_flow();
    for action in ["search", "on_search", "select", "confirm", "on_cancel"] {
        let defects = service.validate_single_action(&single_action(&flow[action])).unwrap();
        assert!(defects.is_empty(), "{action} reported {defects:?}");
    }
}

#[test]
fn single_action_modes_select_buckets() {
    let service = local_service(Arc::new(NoopAuditSink));
    let mut payload = fixture_flow()["select"].clone();
    payload["context"].as_object_mut().unwrap().remove("ttl");
    payload["message"]["order"]["items"][0]["quantity"]["count"] = json!(0);

    let schema_only = json!({"payload": payload, "validationMode": true});
    let schema = service.validate_single_action(&schema_only).unwrap();
    assert_eq!(schema.get("context.ttl"), Some("required field missing"));
    assert!(schema.iter().all(|(path, _)| !path.contains("quantity")));

    let business_only = json!({"payload": payload, "schemaValidation": false});
    let business = service.validate_single_action(&business_only).unwrap();
    assert!(business.get("context.ttl").is_none());
    assert!(!business.is_empty());

    let merged = service.validate_single_action(&json!({"payload": payload})).unwrap();
    assert_eq!(merged.len(), schema.len() + business.len());
}

#[test]
fn wildcard_city_is_reported_for_single_action() {
    let service = local_service(Arc::new(NoopAuditSink));
    let mut payload = fixture_flow()["on_search"].clone();
    payload["context"]["city"] = json!("*");
    let defects = service.validate_single_action(&json!({"payload": payload})).unwrap();
    assert_eq!(defects.get("context.city"), Some("City Code can't be * for on_search request"));
}

#[test]
fn single_action_input_faults() {
    let service = local_service(Arc::new(NoopAuditSink));
    let payload = fixture_flow()["search"].clone();

    let err = service.validate_single_action(&json!({"payload": {"context": {}}})).unwrap_err();
    assert_eq!(err.to_string(), "context, message are required");

    let mut missing = payload.clone();
    missing["context"].as_object_mut().unwrap().remove("core_version");
    let err = service.validate_single_action(&json!({"payload": missing})).unwrap_err();
    assert_eq!(err.to_string(), "context.domain, context.core_version, context.action is required");

    let mut foreign = payload.clone();
    foreign["context"]["domain"] = json!("ONDC:AGR10");
    let err = service.validate_single_action(&json!({"payload": foreign})).unwrap_err();
    assert_eq!(err.kind(), "unsupported_domain");

    let mut logistics = payload.clone();
    logistics["context"]["domain"] = json!("ONDC:LOG10");
    let err = service.validate_single_action(&json!({"payload": logistics})).unwrap_err();
    assert_eq!(err.kind(), "unsupported_domain");

    let mut track = payload.clone();
    track["context"]["action"] = json!("track");
    let err = service.validate_single_action(&json!({"payload": track})).unwrap_err();
    assert_eq!(err.kind(), "unsupported_action");

    let err = service
        .validate_single_action(&json!({"payload": payload, "validationMode": "schema"}))
        .unwrap_err();
    assert_eq!(err.kind(), "malformed_request");
}

// ============================================================================
// SECTION: Validation Format
// ============================================================================

#[test]
fn validation_format_lists_documents_by_action() {
    let service = local_service(Arc::new(NoopAuditSink));
    let documents =
        service.validation_format("retail", Some(RETAIL_GROCERY), Some("1.2.0")).unwrap();
    let actions: Vec<&str> = documents.keys().map(|action| action.as_str()).collect();
    assert_eq!(actions, ["on_search", "search"]);

    let err = service.validation_format("retail", None, Some("1.2.5")).unwrap_err();
    assert_eq!(err.to_string(), "domain, version are required");
    let err = service.validation_format("finance", Some("ONDC:FIS12"), Some("2.0.0")).unwrap_err();
    assert_eq!(err.kind(), "unsupported_domain");
    let err = service.validation_format("retail", Some(RETAIL_GROCERY), Some("9.9.9")).unwrap_err();
    assert_eq!(err.kind(), "unsupported_version");
}
