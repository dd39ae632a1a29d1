// crates/conformance-server/src/lib.rs
// ============================================================================
// Module: Conformance Gate Server
// Description: HTTP surface, key loading, and audit logging for the engine.
// Purpose: Serve conformance validation and report re-verification.
// Dependencies: conformance-core, conformance-rules, conformance-config, axum, tokio
// ============================================================================

//! ## Overview
//! `conformance-server` wraps the conformance engine in a thin HTTP layer.
//! [`ConformanceService`] implements the operations without any transport
//! types; [`ConformanceServer`] maps them onto axum routes. Keys load from
//! files or environment variables at startup and a missing key is fatal.
//!
//! Security posture: every request body is untrusted and size-limited.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod keys;
pub mod server;
pub mod service;

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions and debug output.
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
}

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AttestationAuditEvent;
pub use audit::ConformanceAuditSink;
pub use audit::FileAuditSink;
pub use audit::HttpAuditEvent;
pub use audit::NoopAuditSink;
pub use audit::RequestOutcome;
pub use audit::StderrAuditSink;
pub use keys::KeyError;
pub use server::ConformanceServer;
pub use server::ServerError;
pub use service::ConformanceService;
pub use service::ServiceError;
pub use service::ServiceSettings;
pub use service::TokenVerdict;
pub use service::ValidateResult;
