// crates/conformance-rules/src/retail_v120.rs
// ============================================================================
// Module: Retail 1.2.0 Checkers
// Description: Business checkers for retail 1.2.0 discovery.
// Purpose: Keep the older protocol version verifiable for search flows.
// Dependencies: conformance-core
// ============================================================================

//! ## Overview
//! Protocol 1.2.0 checkers report one undivided defect list, so schema-only
//! and business-only selection still works but merged selection keeps
//! discovery order instead of favoring business messages.

// ============================================================================
// SECTION: Imports
// ============================================================================

use conformance_core::ActionCall;
use conformance_core::CheckerOutput;
use conformance_core::ValidationSession;

use crate::retail_v125::search::check_catalog;
use crate::support::Findings;
use crate::support::check_context;

// ============================================================================
// SECTION: Checkers
// ============================================================================

/// Checks a 1.2.0 `search` request.
pub fn check_search(call: &ActionCall<'_>, session: &ValidationSession) -> CheckerOutput {
    let mut findings = Findings::default();
    check_context(call, session, &mut findings);
    findings.flat()
}

/// Checks a 1.2.0 `on_search` catalog.
pub fn check_on_search(call: &ActionCall<'_>, session: &ValidationSession) -> CheckerOutput {
    let mut findings = Findings::default();
    check_context(call, session, &mut findings);
    if let Some(message) = call.message() {
        check_catalog(message, &mut findings);
    }
    findings.flat()
}
