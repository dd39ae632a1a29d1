// crates/conformance-server/src/audit.rs
// ============================================================================
// Module: Conformance Audit Logging
// Description: Structured audit events for HTTP request handling.
// Purpose: Emit JSON-line audit logs without hard dependencies.
// Dependencies: conformance-config, serde, serde_json
// ============================================================================

//! ## Overview
//! Two events are recorded: `http_request` for every handled request and
//! `report_attested` for every signed report. Events never carry payloads;
//! a report is identified by its canonical hash.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use conformance_config::AuditConfig;
use conformance_config::AuditSinkKind;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Request outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    /// Request handled and the payload conformed.
    Success,
    /// Request handled and the payload had defects.
    Defects,
    /// Request rejected or failed.
    Error,
}

/// HTTP request audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct HttpAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Route label.
    pub route: &'static str,
    /// HTTP status code.
    pub status: u16,
    /// Request outcome.
    pub outcome: RequestOutcome,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Domain named by the request, when known.
    pub domain: Option<String>,
    /// Action named by the request, when known.
    pub action: Option<String>,
}

/// Inputs required to construct an HTTP audit event.
#[derive(Debug, Clone)]
pub struct HttpAuditEventParams {
    /// Route label.
    pub route: &'static str,
    /// HTTP status code.
    pub status: u16,
    /// Request outcome.
    pub outcome: RequestOutcome,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Domain named by the request, when known.
    pub domain: Option<String>,
    /// Action named by the request, when known.
    pub action: Option<String>,
}

/// Report attestation audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct AttestationAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Canonical hash of the signed report.
    pub report_hash: String,
    /// Timestamp bound into the signature.
    pub sign_timestamp: String,
    /// Domain of the validated payload.
    pub domain: Option<String>,
    /// Whether the report recorded a conforming payload.
    pub success: bool,
}

impl HttpAuditEvent {
    /// Creates a new request event with a consistent timestamp.
    #[must_use]
    pub fn new(params: HttpAuditEventParams) -> Self {
        Self {
            event: "http_request",
            timestamp_ms: now_ms(),
            route: params.route,
            status: params.status,
            outcome: params.outcome,
            error_kind: params.error_kind,
            request_bytes: params.request_bytes,
            domain: params.domain,
            action: params.action,
        }
    }
}

impl AttestationAuditEvent {
    /// Creates a new attestation event with a consistent timestamp.
    #[must_use]
    pub fn new(report_hash: String, sign_timestamp: String, domain: Option<String>, success: bool) -> Self {
        Self {
            event: "report_attested",
            timestamp_ms: now_ms(),
            report_hash,
            sign_timestamp,
            domain,
            success,
        }
    }
}

/// Returns milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for conformance server events.
pub trait ConformanceAuditSink: Send + Sync {
    /// Record a request event.
    fn record(&self, event: &HttpAuditEvent);

    /// Record an attestation event.
    fn record_attestation(&self, _event: &AttestationAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl ConformanceAuditSink for StderrAuditSink {
    fn record(&self, event: &HttpAuditEvent) {
        write_stderr(event);
    }

    fn record_attestation(&self, event: &AttestationAuditEvent) {
        write_stderr(event);
    }
}

/// Writes one event line to stderr.
fn write_stderr(event: &impl Serialize) {
    if let Ok(payload) = serde_json::to_string(event) {
        let _ = writeln!(io::stderr(), "{payload}");
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one event line.
    fn append(&self, event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl ConformanceAuditSink for FileAuditSink {
    fn record(&self, event: &HttpAuditEvent) {
        self.append(event);
    }

    fn record_attestation(&self, event: &AttestationAuditEvent) {
        self.append(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl ConformanceAuditSink for NoopAuditSink {
    fn record(&self, _event: &HttpAuditEvent) {}
}

/// Builds the sink selected by configuration.
///
/// # Errors
///
/// Returns an error when the file sink cannot open its log.
pub fn sink_from_config(config: &AuditConfig) -> io::Result<Arc<dyn ConformanceAuditSink>> {
    match (config.sink, config.path.as_deref()) {
        (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
        (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
        (AuditSinkKind::File, Some(path)) => Ok(Arc::new(FileAuditSink::new(Path::new(path.trim()))?)),
        (AuditSinkKind::File, None) => {
            Err(io::Error::new(io::ErrorKind::InvalidInput, "audit.path is required for the file sink"))
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
