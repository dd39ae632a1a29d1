// crates/conformance-core/src/model/identifiers.rs
// ============================================================================
// Module: Conformance Gate Identifiers
// Description: Typed protocol identifiers for versions, domains, actions, and flows.
// Purpose: Keep registry keys and session fields from mixing up plain strings.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers serialize as plain strings and perform no validation on
//! construction. Whether a version or action is supported is decided by the
//! registries, not by these wrappers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Protocol Version
// ============================================================================

/// Protocol core version carried in `context.core_version` (for example `1.2.5`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoreVersion(String);

impl CoreVersion {
    /// Creates a new protocol version.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// Returns the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CoreVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for CoreVersion {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Domain Code
// ============================================================================

/// Full protocol domain code carried in `context.domain` (for example `ONDC:RET11`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainCode(String);

impl DomainCode {
    /// Creates a new domain code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the domain code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the domain variant: the segment after the registry prefix.
    ///
    /// `ONDC:RET11` yields `RET11`; a code without a prefix is its own variant.
    #[must_use]
    pub fn variant(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(_, variant)| variant)
    }
}

impl fmt::Display for DomainCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DomainCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Action Name
// ============================================================================

/// Protocol action carried in `context.action` (for example `on_search`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionName(String);

impl ActionName {
    /// Creates a new action name.
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self(action.into())
    }

    /// Returns the action as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for callback actions (`on_*`), which answer a request.
    #[must_use]
    pub fn is_callback(&self) -> bool {
        self.0.starts_with("on_")
    }

    /// Returns the request action a callback answers (`on_select` -> `select`).
    #[must_use]
    pub fn request_action(&self) -> Option<Self> {
        self.0.strip_prefix("on_").map(Self::new)
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ActionName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Flow Identifier
// ============================================================================

/// Identifier grouping a sequence of related calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(String);

impl FlowId {
    /// Creates a new flow identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for FlowId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Domain Family
// ============================================================================

/// Protocol domain family addressed by the `{domain}` route segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainFamily {
    /// Retail (`ONDC:RETxx`).
    Retail,
    /// Logistics (`ONDC:LOGxx`).
    Logistics,
    /// Financial services (`ONDC:FISxx`).
    Finance,
    /// Mobility (`ONDC:TRVxx`).
    Mobility,
    /// Issue and grievance management.
    Igm,
    /// Reconciliation and settlement framework.
    Rsf,
}

/// Domain variant prefixes and the family each one belongs to.
const DOMAIN_PREFIXES: [(&str, DomainFamily); 4] = [
    ("RET", DomainFamily::Retail),
    ("LOG", DomainFamily::Logistics),
    ("FIS", DomainFamily::Finance),
    ("TRV", DomainFamily::Mobility),
];

impl DomainFamily {
    /// Every family, in route-listing order.
    pub const ALL: [Self; 6] =
        [Self::Retail, Self::Logistics, Self::Finance, Self::Mobility, Self::Igm, Self::Rsf];

    /// Resolves a route segment case-insensitively.
    #[must_use]
    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|family| family.as_str().eq_ignore_ascii_case(segment))
    }

    /// Resolves the family of a full domain code from its variant prefix.
    ///
    /// `ONDC:RET11` is retail; codes with an unknown prefix have no family.
    #[must_use]
    pub fn from_domain_code(code: &DomainCode) -> Option<Self> {
        let variant = code.variant();
        DOMAIN_PREFIXES
            .iter()
            .find(|(prefix, _)| variant.starts_with(prefix))
            .map(|(_, family)| *family)
    }

    /// Returns the lowercase family name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Retail => "retail",
            Self::Logistics => "logistics",
            Self::Finance => "finance",
            Self::Mobility => "mobility",
            Self::Igm => "igm",
            Self::Rsf => "rsf",
        }
    }
}

impl fmt::Display for DomainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
