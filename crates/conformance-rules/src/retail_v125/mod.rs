// crates/conformance-rules/src/retail_v125/mod.rs
// ============================================================================
// Module: Retail 1.2.5 Checkers
// Description: Business checkers for the retail 1.2.5 transaction flow.
// Purpose: Supply cross-field and cross-call rules for each action.
// Dependencies: conformance-core, serde_json
// ============================================================================

//! ## Overview
//! Each checker applies the shared context rules, then its own message rules.
//! Comparisons against earlier calls run only in stateful sessions and only
//! when the earlier call is present. All checkers report bucketed results; the
//! schema bucket is filled by the schema engine during dispatch.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod cancel;
pub mod confirm;
pub mod init;
pub mod search;
pub mod select;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cancel::check_cancel;
pub use cancel::check_on_cancel;
pub use confirm::check_confirm;
pub use confirm::check_on_confirm;
pub use init::check_init;
pub use init::check_on_init;
pub use search::check_on_search;
pub use search::check_on_search_ret11;
pub use search::check_search;
pub use select::check_on_select;
pub use select::check_select;
