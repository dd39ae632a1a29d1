// crates/conformance-server/src/service.rs
// ============================================================================
// Module: Conformance Service
// Description: Transport-agnostic validation, attestation, and lookup.
// Purpose: Implement the conformance operations once for every front end.
// Dependencies: conformance-core, conformance-rules, serde_json, tokio
// ============================================================================

//! ## Overview
//! [`ConformanceService`] runs the four conformance operations against the
//! built-in catalog: full-flow validation with a signed report, stateless
//! report re-verification, single-action validation, and schema lookup.
//! Request bodies are parsed here so the HTTP layer only maps results onto
//! status codes.
//!
//! Security posture: request bodies are untrusted. Signing runs on the
//! blocking pool under a timeout so a stalled signer cannot hold a request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use conformance_config::ConformanceConfig;
use conformance_core::ActionName;
use conformance_core::ActionRegistry;
use conformance_core::AttestationError;
use conformance_core::AttestedReport;
use conformance_core::Attestor;
use conformance_core::CoreVersion;
use conformance_core::DefectMap;
use conformance_core::DispatchError;
use conformance_core::DomainCode;
use conformance_core::DomainFamily;
use conformance_core::FlowId;
use conformance_core::ReportDigest;
use conformance_core::SignedReport;
use conformance_core::ValidationMode;
use conformance_core::ValidationSession;
use conformance_core::VerificationRequest;
use conformance_core::select_errors;
use conformance_core::validate_flow;
use conformance_rules::Catalog;
use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::audit::AttestationAuditEvent;
use crate::audit::ConformanceAuditSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Report message for a flow without defects.
pub const FLOW_VERIFIED: &str = "Logs verified successfully";
/// Report message for a flow with defects.
pub const FLOW_FAILED: &str = "Logs verification failed";
/// Token message for a matching signature.
pub const SIGNATURE_VERIFIED: &str = "Signature verification successful";
/// Token message for a signature that does not match.
pub const SIGNATURE_INVALID: &str = "Invalid signature";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Service operation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Request body is missing a field or has the wrong shape.
    #[error("{0}")]
    MalformedRequest(String),
    /// Domain family is unknown or has no catalog.
    #[error("domain not supported: {0}")]
    UnsupportedDomain(String),
    /// Version or action has no registered rule.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// Verification request or signature is malformed.
    #[error("{0}")]
    Verification(String),
    /// Signer timed out or reported a retryable failure.
    #[error("{0}")]
    SignerUnavailable(String),
    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "malformed_request",
            Self::UnsupportedDomain(_) => "unsupported_domain",
            Self::Dispatch(DispatchError::UnsupportedVersion(_)) => "unsupported_version",
            Self::Dispatch(DispatchError::UnsupportedAction {
                ..
            }) => "unsupported_action",
            Self::Verification(_) => "verification",
            Self::SignerUnavailable(_) => "signer_unavailable",
            Self::Internal(_) => "internal",
        }
    }
}

/// Maps attestation failures onto service errors.
fn attestation_error(err: AttestationError) -> ServiceError {
    match err {
        AttestationError::Signer(err) if err.is_retryable() => {
            ServiceError::SignerUnavailable(err.to_string())
        }
        AttestationError::MalformedVerificationRequest(_)
        | AttestationError::MalformedSignature(_) => ServiceError::Verification(err.to_string()),
        AttestationError::Hash(_) | AttestationError::Signer(_) => {
            ServiceError::Internal(err.to_string())
        }
    }
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Service tunables taken from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Flow identifier used when a request names none.
    pub default_flow: Option<String>,
    /// Cap on defect paths reported per action.
    pub max_reported_defects: Option<usize>,
    /// Upper bound on one signing call.
    pub sign_timeout: Duration,
}

impl ServiceSettings {
    /// Extracts the service settings from a validated configuration.
    #[must_use]
    pub fn from_config(config: &ConformanceConfig) -> Self {
        Self {
            default_flow: config.validation.default_flow.clone(),
            max_reported_defects: config.validation.max_reported_defects,
            sign_timeout: config.signing.timeout(),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&ConformanceConfig::default())
    }
}

// ============================================================================
// SECTION: Requests And Results
// ============================================================================

/// Full-flow validation request body.
#[derive(Debug, Deserialize)]
struct ValidateRequest {
    /// Full domain code (for example `ONDC:RET10`).
    domain: Option<String>,
    /// Protocol core version.
    version: Option<String>,
    /// Calls keyed by action.
    payload: Option<Value>,
    /// Flow identifier.
    flow: Option<Value>,
    /// Buyer-side participant identifier.
    bap_id: Option<String>,
    /// Seller-side participant identifier.
    bpp_id: Option<String>,
}

/// Result of a full-flow validation.
#[derive(Debug, Clone)]
pub struct ValidateResult {
    /// Signed report envelope.
    pub signed: SignedReport,
    /// Canonical hash of the signed report.
    pub digest: ReportDigest,
}

/// Result of a report re-verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenVerdict {
    /// Whether the signature matches the report.
    pub verified: bool,
    /// Human-readable verdict.
    pub message: &'static str,
}

/// Names extracted from a single-action request, for audit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLabels {
    /// Domain code, when present.
    pub domain: Option<String>,
    /// Action, when present.
    pub action: Option<String>,
}

impl CallLabels {
    /// Reads the domain and action labels of a single-action body.
    #[must_use]
    pub fn from_body(body: &Value) -> Self {
        let field = |pointer: &str| body.pointer(pointer).and_then(Value::as_str).map(str::to_string);
        Self {
            domain: field("/payload/context/domain"),
            action: field("/payload/context/action"),
        }
    }
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Conformance operations over a catalog and an attestor.
#[derive(Clone)]
pub struct ConformanceService {
    /// Schema and rule catalog.
    catalog: Arc<Catalog>,
    /// Report signer.
    attestor: Attestor,
    /// Public key used for re-verification.
    verifying_key: VerifyingKey,
    /// Service tunables.
    settings: ServiceSettings,
    /// Audit sink for attestation events.
    audit: Arc<dyn ConformanceAuditSink>,
}

impl std::fmt::Debug for ConformanceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConformanceService").field("settings", &self.settings).finish_non_exhaustive()
    }
}

impl ConformanceService {
    /// Creates a service.
    ///
    /// `verifying_key` is the configured public key; it is expected to match
    /// the attestor's signer.
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        attestor: Attestor,
        verifying_key: VerifyingKey,
        settings: ServiceSettings,
        audit: Arc<dyn ConformanceAuditSink>,
    ) -> Self {
        Self {
            catalog,
            attestor,
            verifying_key,
            settings,
            audit,
        }
    }

    /// Returns the audit sink.
    #[must_use]
    pub fn audit(&self) -> &dyn ConformanceAuditSink {
        self.audit.as_ref()
    }

    /// Validates a flow and returns the signed report.
    ///
    /// The report is signed whether or not the flow conformed; `success`
    /// records the verdict.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] for usage faults (no report is produced),
    /// signer unavailability, and internal failures.
    pub async fn validate(&self, segment: &str, body: &[u8]) -> Result<ValidateResult, ServiceError> {
        let family = self.served_family(segment)?;
        let request: ValidateRequest = serde_json::from_slice(body)
            .map_err(|err| ServiceError::MalformedRequest(format!("invalid request body: {err}")))?;
        let (Some(domain), Some(version), Some(payload)) =
            (request.domain, request.version, request.payload)
        else {
            return Err(ServiceError::MalformedRequest(
                "domain, version, payload are required".to_string(),
            ));
        };
        let Value::Object(flow) = payload else {
            return Err(ServiceError::MalformedRequest(
                "payload must be an object keyed by action".to_string(),
            ));
        };
        let domain_code = DomainCode::new(domain.clone());
        if DomainFamily::from_domain_code(&domain_code) != Some(family) {
            return Err(ServiceError::UnsupportedDomain(format!("{domain} for {family}")));
        }
        let registry = self.registry(family, segment)?;

        let version = CoreVersion::new(version);
        let flow_id = flow_label(request.flow.as_ref()).or_else(|| self.settings.default_flow.clone());
        let mut session =
            ValidationSession::for_flow(flow_id.map(FlowId::new), version.clone(), domain_code.clone());
        let report = validate_flow(registry, &version, &domain_code, &flow, &mut session)?;

        let defects = report.defects(ValidationMode::Merged, self.settings.max_reported_defects);
        let success = defects.is_empty();
        let report = if success {
            None
        } else {
            Some(serde_json::to_value(&defects).map_err(|err| ServiceError::Internal(err.to_string()))?)
        };
        let attested = AttestedReport {
            message: Some((if success { FLOW_VERIFIED } else { FLOW_FAILED }).to_string()),
            report,
            bpp_id: request.bpp_id,
            bap_id: request.bap_id,
            domain: Some(domain.clone()),
            payload: Value::Object(flow),
            report_timestamp: Some(self.attestor.timestamp()),
        };

        let (signed, digest) = self.sign(success, attested).await?;
        self.audit.record_attestation(&AttestationAuditEvent::new(
            digest.as_hex().to_string(),
            signed.sign_timestamp.clone(),
            Some(domain),
            success,
        ));
        Ok(ValidateResult {
            signed,
            digest,
        })
    }

    /// Re-verifies a signed report without re-running validation.
    ///
    /// A well-formed signature that does not match yields `verified: false`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Verification`] when the request or signature is
    /// malformed.
    pub fn validate_token(&self, body: &Value) -> Result<TokenVerdict, ServiceError> {
        let request = VerificationRequest::from_value(body).map_err(attestation_error)?;
        let verified = request.verify(&self.verifying_key).map_err(attestation_error)?;
        Ok(TokenVerdict {
            verified,
            message: if verified { SIGNATURE_VERIFIED } else { SIGNATURE_INVALID },
        })
    }

    /// Validates one `{context, message}` call and returns its defects.
    ///
    /// The call runs in a fresh session; `stateless` defaults to true and
    /// `validationMode` (alias `schemaValidation`) selects the bucket.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the body is malformed or the domain,
    /// version, or action is unsupported.
    pub fn validate_single_action(&self, body: &Value) -> Result<DefectMap, ServiceError> {
        let payload = body.get("payload").filter(|payload| !payload.is_null());
        let context = payload.and_then(|payload| payload.get("context")).filter(|v| !v.is_null());
        let message = payload.and_then(|payload| payload.get("message")).filter(|v| !v.is_null());
        let (Some(payload), Some(context), Some(_)) = (payload, context, message) else {
            return Err(ServiceError::MalformedRequest("context, message are required".to_string()));
        };
        let field = |name: &str| context.get(name).and_then(Value::as_str).filter(|v| !v.is_empty());
        let (Some(domain), Some(version), Some(action)) =
            (field("domain"), field("core_version"), field("action"))
        else {
            return Err(ServiceError::MalformedRequest(
                "context.domain, context.core_version, context.action is required".to_string(),
            ));
        };

        let domain = DomainCode::new(domain);
        let family = DomainFamily::from_domain_code(&domain)
            .ok_or_else(|| ServiceError::UnsupportedDomain(domain.to_string()))?;
        let registry = self.registry(family, domain.as_str())?;
        let version = CoreVersion::new(version);
        let action = ActionName::new(action);

        let mode = ValidationMode::from_flag(mode_flag(body)?);
        let stateless = match body.get("stateless") {
            None | Some(Value::Null) => true,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => {
                return Err(ServiceError::MalformedRequest("stateless must be a boolean".to_string()));
            }
        };
        let flow_id = flow_label(body.get("flow")).or_else(|| self.settings.default_flow.clone());
        let mut session = ValidationSession::for_flow(flow_id.map(FlowId::new), version.clone(), domain.clone())
            .with_stateless(stateless);

        let outcome = registry.run_action(&version, &domain, &action, payload, &mut session)?;
        let mut defects = select_errors(&outcome, mode);
        if let Some(limit) = self.settings.max_reported_defects {
            defects.truncate(limit);
        }
        Ok(defects)
    }

    /// Returns the schema documents registered for a family and version.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when a query parameter is missing, the family
    /// is not served, or the version has no documents.
    pub fn validation_format(
        &self,
        segment: &str,
        domain: Option<&str>,
        version: Option<&str>,
    ) -> Result<BTreeMap<ActionName, Arc<Value>>, ServiceError> {
        let (Some(_), Some(version)) =
            (domain.filter(|v| !v.is_empty()), version.filter(|v| !v.is_empty()))
        else {
            return Err(ServiceError::MalformedRequest("domain, version are required".to_string()));
        };
        let family = self.served_family(segment)?;
        let version = CoreVersion::new(version);
        let documents = self.catalog.schemas().documents_for(family, &version);
        if documents.is_empty() {
            return Err(DispatchError::UnsupportedVersion(version).into());
        }
        Ok(documents)
    }

    /// Resolves a route segment to a family with a catalog.
    fn served_family(&self, segment: &str) -> Result<DomainFamily, ServiceError> {
        DomainFamily::from_segment(segment)
            .filter(|family| self.catalog.serves(*family))
            .ok_or_else(|| ServiceError::UnsupportedDomain(segment.to_string()))
    }

    /// Returns the action registry of a served family.
    fn registry(&self, family: DomainFamily, label: &str) -> Result<&ActionRegistry, ServiceError> {
        self.catalog.actions(family).ok_or_else(|| ServiceError::UnsupportedDomain(label.to_string()))
    }

    /// Signs a report on the blocking pool under the configured timeout.
    async fn sign(
        &self,
        success: bool,
        report: AttestedReport,
    ) -> Result<(SignedReport, ReportDigest), ServiceError> {
        let attestor = self.attestor.clone();
        let task = tokio::task::spawn_blocking(move || attestor.sign_report(success, report));
        match tokio::time::timeout(self.settings.sign_timeout, task).await {
            Err(_) => Err(ServiceError::SignerUnavailable("signer unavailable: signing timed out".to_string())),
            Ok(Err(err)) => Err(ServiceError::Internal(format!("signing task failed: {err}"))),
            Ok(Ok(result)) => result.map_err(attestation_error),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a flow identifier given as a string or a number.
fn flow_label(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Reads the tri-state bucket flag from `validationMode` or `schemaValidation`.
fn mode_flag(body: &Value) -> Result<Option<bool>, ServiceError> {
    let flag = body
        .get("validationMode")
        .filter(|value| !value.is_null())
        .or_else(|| body.get("schemaValidation").filter(|value| !value.is_null()));
    match flag {
        None => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(_) => Err(ServiceError::MalformedRequest("validationMode must be a boolean".to_string())),
    }
}
