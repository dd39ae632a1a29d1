// crates/conformance-core/src/runtime/attestation.rs
// ============================================================================
// Module: Report Attestation
// Description: Hash-and-sign for validation reports and stateless re-verification.
// Purpose: Let third parties check a report without re-running validation.
// Dependencies: base64, ed25519-dalek, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A report is canonicalized with RFC 8785, hashed with SHA-256, and the hex
//! digest is joined with the signing timestamp as `"{digest}|{timestamp}"`.
//! That signing string is signed with Ed25519 and the signature is shipped as
//! standard base64. Verification rebuilds the same string from the supplied
//! report and timestamp and needs nothing but the public key.
//!
//! Security posture: verification requests are untrusted. Shape checks run
//! before any cryptography, and only strict Ed25519 verification is used.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::Signature;
use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use serde_json::Value;
use thiserror::Error;

use crate::interfaces::ReportSigner;
use crate::interfaces::SignerError;
use crate::model::AttestedReport;
use crate::model::Clock;
use crate::model::HashError;
use crate::model::ReportDigest;
use crate::model::SignedReport;
use crate::model::clock::format_timestamp;
use crate::model::hashing::digest_canonical_json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fields a verification request must carry with a non-null value.
const REQUIRED_REQUEST_FIELDS: [&str; 4] = ["signature", "signTimestamp", "response", "success"];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Attestation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum AttestationError {
    /// Report could not be canonicalized.
    #[error(transparent)]
    Hash(#[from] HashError),
    /// Signer failed.
    #[error(transparent)]
    Signer(#[from] SignerError),
    /// Verification request is missing a field or has the wrong shape.
    #[error("malformed verification request: {0}")]
    MalformedVerificationRequest(String),
    /// Signature is not a base64 Ed25519 signature.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
}

// ============================================================================
// SECTION: Local Signer
// ============================================================================

/// In-process Ed25519 signer.
pub struct LocalSigner {
    /// Private key.
    key: SigningKey,
}

impl LocalSigner {
    /// Wraps a signing key.
    #[must_use]
    pub const fn new(key: SigningKey) -> Self {
        Self {
            key,
        }
    }
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner").field("key", &"<redacted>").finish()
    }
}

impl ReportSigner for LocalSigner {
    fn sign(&self, message: &[u8]) -> Result<Signature, SignerError> {
        self.key.try_sign(message).map_err(|err| SignerError::Failed(err.to_string()))
    }

    fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }
}

// ============================================================================
// SECTION: Attestor
// ============================================================================

/// Signature and timestamp produced for one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    /// Digest of the canonical report.
    pub digest: ReportDigest,
    /// Base64 signature over the signing string.
    pub signature: String,
    /// Timestamp bound into the signing string.
    pub sign_timestamp: String,
}

/// Signs reports with a signer and a clock.
#[derive(Clone)]
pub struct Attestor {
    /// Signing key holder.
    signer: Arc<dyn ReportSigner>,
    /// Source of signing timestamps.
    clock: Arc<dyn Clock>,
}

impl Attestor {
    /// Creates an attestor.
    #[must_use]
    pub fn new(signer: Arc<dyn ReportSigner>, clock: Arc<dyn Clock>) -> Self {
        Self {
            signer,
            clock,
        }
    }

    /// Returns the public key matching the signer.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signer.verifying_key()
    }

    /// Returns the current time as a report timestamp.
    #[must_use]
    pub fn timestamp(&self) -> String {
        format_timestamp(self.clock.now())
    }

    /// Hashes and signs a report.
    ///
    /// # Errors
    ///
    /// Returns [`AttestationError`] when canonicalization or signing fails.
    pub fn attest(&self, report: &AttestedReport) -> Result<Attestation, AttestationError> {
        let digest = digest_canonical_json(report)?;
        let sign_timestamp = self.timestamp();
        let signing_string = digest.signing_string(&sign_timestamp);
        let signature = self.signer.sign(signing_string.as_bytes())?;
        Ok(Attestation {
            digest,
            signature: STANDARD.encode(signature.to_bytes()),
            sign_timestamp,
        })
    }

    /// Signs a report and wraps it in the signed envelope.
    ///
    /// # Errors
    ///
    /// Returns [`AttestationError`] when canonicalization or signing fails.
    pub fn sign_report(
        &self,
        success: bool,
        report: AttestedReport,
    ) -> Result<(SignedReport, ReportDigest), AttestationError> {
        let attestation = self.attest(&report)?;
        let signed = SignedReport {
            success,
            response: report,
            signature: attestation.signature,
            sign_timestamp: attestation.sign_timestamp,
        };
        Ok((signed, attestation.digest))
    }
}

impl std::fmt::Debug for Attestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attestor").finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Verifies a report signature.
///
/// Returns `Ok(false)` for a well-formed signature that does not match.
///
/// # Errors
///
/// Returns [`AttestationError::MalformedSignature`] when the signature is not
/// base64 or has the wrong length, and [`AttestationError::Hash`] when the
/// report cannot be canonicalized.
pub fn verify_report(
    report: &AttestedReport,
    signature: &str,
    sign_timestamp: &str,
    key: &VerifyingKey,
) -> Result<bool, AttestationError> {
    let bytes = STANDARD
        .decode(signature.trim())
        .map_err(|err| AttestationError::MalformedSignature(err.to_string()))?;
    let signature = Signature::from_slice(&bytes)
        .map_err(|err| AttestationError::MalformedSignature(err.to_string()))?;
    let digest = digest_canonical_json(report)?;
    let signing_string = digest.signing_string(sign_timestamp);
    Ok(key.verify_strict(signing_string.as_bytes(), &signature).is_ok())
}

/// Parsed re-verification request.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRequest {
    /// Success flag echoed from the signed envelope.
    pub success: bool,
    /// Report the signature claims to cover.
    pub response: AttestedReport,
    /// Base64 signature.
    pub signature: String,
    /// Signing timestamp.
    pub sign_timestamp: String,
}

impl VerificationRequest {
    /// Parses and shape-checks a raw request body.
    ///
    /// # Errors
    ///
    /// Returns [`AttestationError::MalformedVerificationRequest`] when any of
    /// `signature`, `signTimestamp`, `response`, `success`, or
    /// `response.payload` is missing or null, or a field has the wrong type.
    pub fn from_value(body: &Value) -> Result<Self, AttestationError> {
        let malformed = AttestationError::MalformedVerificationRequest;
        for field in REQUIRED_REQUEST_FIELDS {
            if body.get(field).is_none_or(Value::is_null) {
                return Err(malformed(format!("missing field `{field}`")));
            }
        }
        if body.pointer("/response/payload").is_none_or(Value::is_null) {
            return Err(malformed("missing field `response.payload`".to_string()));
        }
        let signed: SignedReport = serde_json::from_value(body.clone())
            .map_err(|err| malformed(err.to_string()))?;
        Ok(Self {
            success: signed.success,
            response: signed.response,
            signature: signed.signature,
            sign_timestamp: signed.sign_timestamp,
        })
    }

    /// Verifies the request against a public key.
    ///
    /// # Errors
    ///
    /// See [`verify_report`].
    pub fn verify(&self, key: &VerifyingKey) -> Result<bool, AttestationError> {
        verify_report(&self.response, &self.signature, &self.sign_timestamp, key)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use serde_json::json;

    use super::AttestationError;
    use super::VerificationRequest;

    #[test]
    fn missing_payload_is_malformed() {
        let body = json!({
            "success": true,
            "response": {"message": "ok"},
            "signature": "AAAA",
            "signTimestamp": "2024-05-01T10:00:00.000Z"
        });
        let err = VerificationRequest::from_value(&body).unwrap_err();
        assert!(matches!(err, AttestationError::MalformedVerificationRequest(_)));
    }

    #[test]
    fn null_signature_is_malformed() {
        let body = json!({
            "success": true,
            "response": {"payload": {}},
            "signature": null,
            "signTimestamp": "2024-05-01T10:00:00.000Z"
        });
        let err = VerificationRequest::from_value(&body).unwrap_err();
        assert!(err.to_string().contains("signature"));
    }
}
