// crates/conformance-core/src/schema/mod.rs
// ============================================================================
// Module: Schema Validation
// Description: Descriptor compilation, format registry, and validation engine.
// Purpose: Check wire payloads against declarative protocol schemas.
// Dependencies: regex, serde_json, time, url
// ============================================================================

//! ## Overview
//! Schema documents compile into [`SchemaDescriptor`] trees at catalog load.
//! [`validate`] interprets a descriptor against an untrusted value and yields
//! schema defects; it has no failure mode of its own.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod descriptor;
pub mod engine;
pub mod formats;
pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use descriptor::Pattern;
pub use descriptor::SchemaDescriptor;
pub use descriptor::SchemaLoadError;
pub use descriptor::ValueType;
pub use engine::ROOT_PATH;
pub use engine::conforms;
pub use engine::validate;
pub use formats::Format;
pub use registry::SchemaEntry;
pub use registry::SchemaRegistry;
