// crates/conformance-core/src/model/hashing.rs
// ============================================================================
// Module: Conformance Gate Canonical Hashing
// Description: RFC 8785 canonicalization, SHA-256 digests, signing strings.
// Purpose: Give attestation one fixed, versioned byte form for every report.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! A report is hashed over its RFC 8785 (JCS) canonical form, so the digest is
//! independent of key order, whitespace, and the process that produced the
//! JSON. The digest and the signing timestamp are joined into the signing
//! string `"{hex digest}|{timestamp}"`.
//!
//! The canonical form is part of the signed wire contract. Any change to it
//! must bump [`CANONICALIZATION_SCHEME`] because it invalidates every
//! signature issued under the previous scheme.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fmt::Write as _;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Identifier of the canonicalize/hash/sign scheme used for attestations.
pub const CANONICALIZATION_SCHEME: &str = "jcs-sha256-ed25519/v1";

/// Separator between the digest and the timestamp in a signing string.
pub const SIGNING_STRING_SEPARATOR: char = '|';

// ============================================================================
// SECTION: Digest
// ============================================================================

/// SHA-256 digest of a canonical report, rendered as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportDigest(String);

impl ReportDigest {
    /// Returns the lowercase hex form of the digest.
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Builds the signing string that binds this digest to a timestamp.
    #[must_use]
    pub fn signing_string(&self, timestamp: &str) -> String {
        format!("{}{SIGNING_STRING_SEPARATOR}{timestamp}", self.0)
    }
}

impl fmt::Display for ReportDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing canonical hashes.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Returns the RFC 8785 canonical JSON bytes for a serializable value.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes the canonical JSON form of a value.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn digest_canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<ReportDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(digest_bytes(&bytes))
}

/// Hashes raw bytes with SHA-256.
#[must_use]
pub fn digest_bytes(bytes: &[u8]) -> ReportDigest {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    ReportDigest(hex)
}
