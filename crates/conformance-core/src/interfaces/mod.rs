// crates/conformance-core/src/interfaces/mod.rs
// ============================================================================
// Module: Conformance Interfaces
// Description: Contract surfaces for business checkers and report signers.
// Purpose: Keep per-domain rule bodies and key custody out of the engine.
// Dependencies: ed25519-dalek, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The engine owns dispatch, sequencing, defect merging, and hashing. Two
//! things are plugged in from outside: the business checker for each
//! registered action, and the signer that holds the attestation key.
//! Checkers never fail; everything they find is a defect. Signers may fail,
//! and a transient failure is reported as retryable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use ed25519_dalek::Signature;
use ed25519_dalek::VerifyingKey;
use serde_json::Value;
use thiserror::Error;

use crate::model::ActionName;
use crate::model::CoreVersion;
use crate::model::DomainCode;
use crate::model::ValidationError;
use crate::runtime::session::ValidationSession;

// ============================================================================
// SECTION: Action Call
// ============================================================================

/// One protocol call presented to a checker.
///
/// # Invariants
/// - `payload` is the untrusted `{context, message}` pair exactly as received.
#[derive(Debug, Clone, Copy)]
pub struct ActionCall<'a> {
    /// Protocol version the call was dispatched under.
    pub version: &'a CoreVersion,
    /// Full domain code (for example `ONDC:RET10`).
    pub domain: &'a DomainCode,
    /// Dispatched action.
    pub action: &'a ActionName,
    /// Raw payload.
    pub payload: &'a Value,
}

impl<'a> ActionCall<'a> {
    /// Returns `payload.context`, if present.
    #[must_use]
    pub fn context(&self) -> Option<&'a Value> {
        self.payload.get("context")
    }

    /// Returns `payload.message`, if present.
    #[must_use]
    pub fn message(&self) -> Option<&'a Value> {
        self.payload.get("message")
    }

    /// Returns a string field of `payload.context`.
    #[must_use]
    pub fn context_str(&self, field: &str) -> Option<&'a str> {
        self.context().and_then(|context| context.get(field)).and_then(Value::as_str)
    }
}

// ============================================================================
// SECTION: Checker
// ============================================================================

/// Defects produced by a business checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckerOutput {
    /// Single list; each defect carries its own kind.
    Flat(Vec<ValidationError>),
    /// Separate schema and business lists.
    Bucketed {
        /// Schema defects found by the checker itself.
        schema: Vec<ValidationError>,
        /// Business defects.
        business: Vec<ValidationError>,
    },
}

/// Business rule body registered for one action.
///
/// Implementations read the session history but never mutate it; the
/// dispatcher records the call after the checker returns.
pub trait ActionChecker: Send + Sync {
    /// Checks one call against the flow seen so far.
    fn check(&self, call: &ActionCall<'_>, session: &ValidationSession) -> CheckerOutput;
}

impl<F> ActionChecker for F
where
    F: Fn(&ActionCall<'_>, &ValidationSession) -> CheckerOutput + Send + Sync,
{
    fn check(&self, call: &ActionCall<'_>, session: &ValidationSession) -> CheckerOutput {
        self(call, session)
    }
}

// ============================================================================
// SECTION: Signer
// ============================================================================

/// Signer errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// Signer is temporarily unavailable; the caller may retry.
    #[error("signer unavailable: {0}")]
    Unavailable(String),
    /// Signer rejected the request.
    #[error("signing failed: {0}")]
    Failed(String),
}

impl SignerError {
    /// Returns true when retrying may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Holder of the attestation signing key.
pub trait ReportSigner: Send + Sync {
    /// Signs the signing string bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError`] when the key cannot be used.
    fn sign(&self, message: &[u8]) -> Result<Signature, SignerError>;

    /// Returns the public half of the signing key.
    fn verifying_key(&self) -> VerifyingKey;
}
