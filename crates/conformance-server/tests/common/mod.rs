// crates/conformance-server/tests/common/mod.rs
// ============================================================================
// Module: Server Test Helpers
// Description: Shared fixtures, signers, and sinks for server tests.
// ============================================================================

#![allow(dead_code, reason = "Each test binary uses a different subset.")]

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use conformance_core::Attestor;
use conformance_core::LocalSigner;
use conformance_core::ReportSigner;
use conformance_core::SignerError;
use conformance_core::SystemClock;
use conformance_rules::Catalog;
use conformance_server::AttestationAuditEvent;
use conformance_server::ConformanceAuditSink;
use conformance_server::ConformanceService;
use conformance_server::HttpAuditEvent;
use conformance_server::ServiceSettings;
use ed25519_dalek::Signature;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use serde_json::Value;
use serde_json::json;

pub const RETAIL_GROCERY: &str = "ONDC:RET10";

pub fn fixture_flow() -> Value {
    serde_json::from_str(include_str!("../fixtures/retail_flow.json")).expect("fixture parses")
}

pub fn validate_body(flow: Value) -> Value {
    json!({
        "domain": RETAIL_GROCERY,
        "version": "1.2.5",
        "payload": flow,
        "flow": "retail-1",
        "bap_id": "buyer.example.com",
        "bpp_id": "seller.example.com",
    })
}

pub fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[42u8; 32])
}

/// Audit sink that keeps every event as JSON.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<Value>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Value> {
        self.events.lock().expect("sink lock").clone()
    }
}

impl ConformanceAuditSink for RecordingSink {
    fn record(&self, event: &HttpAuditEvent) {
        self.events.lock().expect("sink lock").push(serde_json::to_value(event).expect("event"));
    }

    fn record_attestation(&self, event: &AttestationAuditEvent) {
        self.events.lock().expect("sink lock").push(serde_json::to_value(event).expect("event"));
    }
}

/// Signer that blocks longer than any test timeout.
pub struct SlowSigner {
    pub inner: LocalSigner,
    pub delay: Duration,
}

impl ReportSigner for SlowSigner {
    fn sign(&self, message: &[u8]) -> Result<Signature, SignerError> {
        std::thread::sleep(self.delay);
        self.inner.sign(message)
    }

    fn verifying_key(&self) -> VerifyingKey {
        self.inner.verifying_key()
    }
}

/// Signer whose backing key store is offline.
pub struct OfflineSigner {
    pub key: VerifyingKey,
}

impl ReportSigner for OfflineSigner {
    fn sign(&self, _message: &[u8]) -> Result<Signature, SignerError> {
        Err(SignerError::Unavailable("key store offline".to_string()))
    }

    fn verifying_key(&self) -> VerifyingKey {
        self.key
    }
}

pub fn service_with(
    signer: Arc<dyn ReportSigner>,
    settings: ServiceSettings,
    audit: Arc<dyn ConformanceAuditSink>,
) -> ConformanceService {
    let verifying_key = signer.verifying_key();
    let catalog = Catalog::builtin().expect("catalog builds");
    ConformanceService::new(
        Arc::new(catalog),
        Attestor::new(signer, Arc::new(SystemClock)),
        verifying_key,
        settings,
        audit,
    )
}

pub fn local_service(audit: Arc<dyn ConformanceAuditSink>) -> ConformanceService {
    service_with(Arc::new(LocalSigner::new(signing_key())), ServiceSettings::default(), audit)
}
