// crates/conformance-core/src/model/mod.rs
// ============================================================================
// Module: Conformance Model
// Description: Identifiers, defects, reports, hashing, and clock helpers.
// Purpose: Provide stable, serializable types shared by every engine layer.
// Dependencies: serde, serde_jcs, sha2, time
// ============================================================================

//! ## Overview
//! Core types are the vocabulary of the engine: typed protocol identifiers,
//! the tagged defect model with its merge policy, the attested report record,
//! and canonical hashing. Higher layers (schema engine, dispatcher,
//! attestation, HTTP surface) depend on these and never redefine them.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod clock;
pub mod defect;
pub mod hashing;
pub mod identifiers;
pub mod report;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use clock::Clock;
pub use clock::FixedClock;
pub use clock::SystemClock;
pub use defect::DefectKind;
pub use defect::DefectMap;
pub use defect::ValidationError;
pub use defect::ValidationMode;
pub use defect::ValidationOutcome;
pub use defect::select_errors;
pub use hashing::CANONICALIZATION_SCHEME;
pub use hashing::HashError;
pub use hashing::ReportDigest;
pub use identifiers::ActionName;
pub use identifiers::CoreVersion;
pub use identifiers::DomainCode;
pub use identifiers::DomainFamily;
pub use identifiers::FlowId;
pub use report::AttestedReport;
pub use report::SignedReport;
