// crates/conformance-core/src/runtime/mod.rs
// ============================================================================
// Module: Conformance Runtime
// Description: Sessions, action dispatch, flow validation, and attestation.
// Purpose: Execute validation calls and sign their reports.
// Dependencies: crate::model, crate::schema, crate::interfaces
// ============================================================================

//! ## Overview
//! The runtime threads a call-scoped [`ValidationSession`] through the
//! [`ActionRegistry`] pipeline, validates whole flows in protocol order, and
//! attests the resulting reports.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod attestation;
pub mod dispatch;
pub mod flow;
pub mod session;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use attestation::Attestation;
pub use attestation::AttestationError;
pub use attestation::Attestor;
pub use attestation::LocalSigner;
pub use attestation::VerificationRequest;
pub use attestation::verify_report;
pub use dispatch::ActionRegistry;
pub use dispatch::ActionRule;
pub use dispatch::DUPLICATE_MESSAGE_ID;
pub use dispatch::DispatchError;
pub use dispatch::MESSAGE_ID_PATH;
pub use flow::ActionDefects;
pub use flow::FLOW_ORDER;
pub use flow::FlowReport;
pub use flow::ordered_actions;
pub use flow::validate_flow;
pub use session::PriorCall;
pub use session::ValidationSession;
