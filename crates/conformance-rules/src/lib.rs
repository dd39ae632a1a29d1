// crates/conformance-rules/src/lib.rs
// ============================================================================
// Module: Conformance Gate Rules
// Description: Built-in protocol catalog (schema documents and checkers).
// Purpose: Register per-domain rules with the conformance engine.
// Dependencies: conformance-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This crate ships the retail catalog: schema documents for protocol 1.2.5
//! (the full search-to-cancel flow) and 1.2.0 (discovery only), embedded at
//! compile time, plus one business checker per action. [`Catalog::builtin`]
//! compiles and registers everything; the engine itself stays free of
//! domain data.
//!
//! Security posture: checkers read untrusted payloads and never fail; every
//! problem they find is a business defect.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod catalog;
pub mod retail_v120;
pub mod retail_v125;
mod support;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::Catalog;
pub use catalog::CatalogError;
pub use retail_v125::cancel::BUYER_CANCELLATION_REASONS;
pub use retail_v125::confirm::ON_CONFIRM_STATES;
