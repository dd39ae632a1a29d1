// crates/conformance-core/src/lib.rs
// ============================================================================
// Module: Conformance Gate Core
// Description: Protocol conformance engine for context/message payloads.
// Purpose: Validate protocol calls, classify defects, and attest reports.
// Dependencies: serde, serde_json, serde_jcs, sha2, ed25519-dalek, regex, time
// ============================================================================

//! ## Overview
//! The core crate is the protocol conformance engine. It has four parts:
//! - [`schema`]: a declarative schema interpreter with protocol formats.
//! - [`runtime::dispatch`]: the action registry and sequence tracker.
//! - [`model::defect`]: the defect taxonomy and merge policy.
//! - [`runtime::attestation`]: hash-and-sign and stateless re-verification.
//!
//! Per-domain schema documents and business checkers are not part of this
//! crate; they are registered through [`ActionRegistry`] and
//! [`SchemaRegistry`] at startup.
//!
//! Security posture: every payload is untrusted. The engine reports what it
//! finds as defects and never fails on malformed input.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod interfaces;
pub mod model;
pub mod runtime;
pub mod schema;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use interfaces::ActionCall;
pub use interfaces::ActionChecker;
pub use interfaces::CheckerOutput;
pub use interfaces::ReportSigner;
pub use interfaces::SignerError;
pub use model::ActionName;
pub use model::AttestedReport;
pub use model::CANONICALIZATION_SCHEME;
pub use model::Clock;
pub use model::CoreVersion;
pub use model::DefectKind;
pub use model::DefectMap;
pub use model::DomainCode;
pub use model::DomainFamily;
pub use model::FixedClock;
pub use model::FlowId;
pub use model::HashError;
pub use model::ReportDigest;
pub use model::SignedReport;
pub use model::SystemClock;
pub use model::ValidationError;
pub use model::ValidationMode;
pub use model::ValidationOutcome;
pub use model::select_errors;
pub use runtime::ActionDefects;
pub use runtime::ActionRegistry;
pub use runtime::ActionRule;
pub use runtime::AttestationError;
pub use runtime::Attestor;
pub use runtime::DispatchError;
pub use runtime::FlowReport;
pub use runtime::LocalSigner;
pub use runtime::PriorCall;
pub use runtime::ValidationSession;
pub use runtime::VerificationRequest;
pub use runtime::validate_flow;
pub use runtime::verify_report;
pub use schema::SchemaDescriptor;
pub use schema::SchemaLoadError;
pub use schema::SchemaRegistry;
