// crates/conformance-core/src/model/clock.rs
// ============================================================================
// Module: Conformance Gate Time Model
// Description: Clock abstraction and RFC 3339 timestamp helpers.
// Purpose: Keep wall-clock reads at explicit seams so reports stay testable.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Report and signing timestamps come from a [`Clock`]. Production code uses
//! [`SystemClock`]; tests pin time with [`FixedClock`]. Timestamps are written
//! as UTC with millisecond precision (`2024-05-01T10:00:00.000Z`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::OffsetDateTime;
use time::UtcOffset;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> OffsetDateTime;
}

/// Clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

// ============================================================================
// SECTION: Formatting
// ============================================================================

/// Formats an instant as a UTC RFC 3339 timestamp with milliseconds.
#[must_use]
pub fn format_timestamp(instant: OffsetDateTime) -> String {
    let utc = instant.to_offset(UtcOffset::UTC);
    let layout = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    );
    utc.format(layout).unwrap_or_else(|_| utc.unix_timestamp().to_string())
}

/// Parses an RFC 3339 timestamp.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(text, &Rfc3339).ok()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
