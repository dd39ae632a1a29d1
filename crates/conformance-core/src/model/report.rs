// crates/conformance-core/src/model/report.rs
// ============================================================================
// Module: Conformance Gate Report Records
// Description: The attested report record and its signed envelope.
// Purpose: Fix the externally visible record layout that signatures bind to.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`AttestedReport`] is the unit of external compatibility. Its serialized
//! field names are part of the signed contract; absent optional fields are
//! omitted rather than written as `null`, so a report rebuilt from a
//! verification request hashes exactly like the report that was signed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Attested Report
// ============================================================================

/// Validation report record that is hashed and signed.
///
/// # Invariants
/// - Never mutated after signing; any field change invalidates the signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttestedReport {
    /// Summary message for the validation outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Validation report (defects keyed by action), when one was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<Value>,
    /// Seller-side participant identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpp_id: Option<String>,
    /// Buyer-side participant identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bap_id: Option<String>,
    /// Domain the payload was validated against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Echo of the payload under test.
    pub payload: Value,
    /// RFC 3339 time the report was produced.
    #[serde(rename = "reportTimestamp", default, skip_serializing_if = "Option::is_none")]
    pub report_timestamp: Option<String>,
}

// ============================================================================
// SECTION: Signed Envelope
// ============================================================================

/// Attested report together with its signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedReport {
    /// Whether validation succeeded.
    pub success: bool,
    /// The report the signature covers.
    pub response: AttestedReport,
    /// Base64 Ed25519 signature over the signing string.
    pub signature: String,
    /// RFC 3339 time the signature was produced.
    #[serde(rename = "signTimestamp")]
    pub sign_timestamp: String,
}
