// crates/conformance-config/src/lib.rs
// ============================================================================
// Module: Conformance Gate Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for conformance.toml semantics.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! `conformance-config` defines the configuration model for the conformance
//! server: bind address and body limit, signing key sources and timeout,
//! audit sink, and validation defaults. Validation is strict and
//! fail-closed.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuditConfig;
pub use config::AuditSinkKind;
pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::ConformanceConfig;
pub use config::DEFAULT_PUBLIC_KEY_ENV;
pub use config::DEFAULT_SIGNING_KEY_ENV;
pub use config::KeySource;
pub use config::ServerConfig;
pub use config::SigningConfig;
pub use config::ValidationConfig;
