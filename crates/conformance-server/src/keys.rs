// crates/conformance-server/src/keys.rs
// ============================================================================
// Module: Key Loading
// Description: Ed25519 key loading from files and environment variables.
// Purpose: Resolve configured key sources into signing and verifying keys.
// Dependencies: base64, conformance-config, ed25519-dalek
// ============================================================================

//! ## Overview
//! Key files hold either raw bytes or base64 text; environment variables hold
//! base64 text. A signing key may be given as a 32-byte seed or a 64-byte
//! keypair (seed followed by public key); the keypair form is checked for
//! consistency. Missing or malformed keys are configuration faults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use conformance_config::KeySource;
use ed25519_dalek::KEYPAIR_LENGTH;
use ed25519_dalek::PUBLIC_KEY_LENGTH;
use ed25519_dalek::SECRET_KEY_LENGTH;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum key file size in bytes.
const MAX_KEY_FILE_BYTES: u64 = 4096;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Key loading errors.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Key file could not be read.
    #[error("unable to read key file {path}: {reason}")]
    Io {
        /// Key file path.
        path: String,
        /// I/O diagnostic.
        reason: String,
    },
    /// Environment variable is unset or empty.
    #[error("key environment variable {0} is not set")]
    MissingEnv(String),
    /// Key bytes are malformed.
    #[error("invalid {kind}: {reason}")]
    Invalid {
        /// Key kind label.
        kind: &'static str,
        /// Diagnostic.
        reason: String,
    },
    /// Verifying key does not belong to the signing key.
    #[error("configured public key does not match the signing key")]
    Mismatch,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads the signing key from a configured source.
///
/// # Errors
///
/// Returns [`KeyError`] when the source is missing or malformed.
pub fn load_signing_key(source: &KeySource) -> Result<SigningKey, KeyError> {
    let bytes = read_source(source, "signing key")?;
    signing_key_from_bytes(&bytes)
}

/// Loads the verifying key from a configured source.
///
/// # Errors
///
/// Returns [`KeyError`] when the source is missing or malformed.
pub fn load_verifying_key(source: &KeySource) -> Result<VerifyingKey, KeyError> {
    let bytes = read_source(source, "public key")?;
    verifying_key_from_bytes(&bytes)
}

/// Checks that a verifying key belongs to a signing key.
///
/// # Errors
///
/// Returns [`KeyError::Mismatch`] when the keys differ.
pub fn ensure_key_pair(signing: &SigningKey, verifying: &VerifyingKey) -> Result<(), KeyError> {
    if signing.verifying_key() == *verifying { Ok(()) } else { Err(KeyError::Mismatch) }
}

/// Encodes key bytes as base64 text for key files and environment variables.
#[must_use]
pub fn encode_key(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes a signing key from a seed or keypair, raw or base64.
///
/// # Errors
///
/// Returns [`KeyError::Invalid`] when the bytes are not a key, and
/// [`KeyError::Mismatch`] when a keypair's public half is inconsistent.
pub fn signing_key_from_bytes(bytes: &[u8]) -> Result<SigningKey, KeyError> {
    let decoded = decode_key_bytes(bytes, &[SECRET_KEY_LENGTH, KEYPAIR_LENGTH], "signing key")?;
    if let Ok(seed) = <[u8; SECRET_KEY_LENGTH]>::try_from(decoded.as_slice()) {
        return Ok(SigningKey::from_bytes(&seed));
    }
    let keypair = <[u8; KEYPAIR_LENGTH]>::try_from(decoded.as_slice())
        .map_err(|_| invalid("signing key", "expected 32 or 64 bytes"))?;
    SigningKey::from_keypair_bytes(&keypair).map_err(|_| KeyError::Mismatch)
}

/// Decodes a verifying key, raw or base64.
///
/// # Errors
///
/// Returns [`KeyError::Invalid`] when the bytes are not a valid point.
pub fn verifying_key_from_bytes(bytes: &[u8]) -> Result<VerifyingKey, KeyError> {
    let decoded = decode_key_bytes(bytes, &[PUBLIC_KEY_LENGTH], "public key")?;
    let key = <[u8; PUBLIC_KEY_LENGTH]>::try_from(decoded.as_slice())
        .map_err(|_| invalid("public key", "expected 32 bytes"))?;
    VerifyingKey::from_bytes(&key).map_err(|err| invalid("public key", &err.to_string()))
}

/// Reads key material from a file or environment variable.
fn read_source(source: &KeySource, kind: &'static str) -> Result<Vec<u8>, KeyError> {
    match source {
        KeySource::File(path) => read_key_file(path, kind),
        KeySource::Env(name) => env_key_bytes(name, env::var(name).ok()),
    }
}

/// Reads a key file with a size limit.
fn read_key_file(path: &Path, kind: &'static str) -> Result<Vec<u8>, KeyError> {
    let io_error = |reason: String| KeyError::Io {
        path: path.display().to_string(),
        reason,
    };
    let metadata = fs::metadata(path).map_err(|err| io_error(err.to_string()))?;
    if metadata.len() > MAX_KEY_FILE_BYTES {
        return Err(invalid(kind, "key file exceeds size limit"));
    }
    fs::read(path).map_err(|err| io_error(err.to_string()))
}

/// Turns an environment variable value into key text bytes.
fn env_key_bytes(name: &str, value: Option<String>) -> Result<Vec<u8>, KeyError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.into_bytes()),
        _ => Err(KeyError::MissingEnv(name.to_string())),
    }
}

/// Accepts raw bytes of an allowed length, else decodes base64 text.
fn decode_key_bytes(
    bytes: &[u8],
    lengths: &[usize],
    kind: &'static str,
) -> Result<Vec<u8>, KeyError> {
    if lengths.contains(&bytes.len()) {
        return Ok(bytes.to_vec());
    }
    let text = std::str::from_utf8(bytes).map_err(|_| invalid(kind, "key must be raw bytes or utf-8 base64"))?;
    let decoded = STANDARD.decode(text.trim()).map_err(|_| invalid(kind, "invalid base64"))?;
    if lengths.contains(&decoded.len()) {
        Ok(decoded)
    } else {
        Err(invalid(kind, &format!("unexpected key length {}", decoded.len())))
    }
}

/// Builds an invalid-key error.
fn invalid(kind: &'static str, reason: &str) -> KeyError {
    KeyError::Invalid {
        kind,
        reason: reason.to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
