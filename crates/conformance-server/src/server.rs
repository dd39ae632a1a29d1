// crates/conformance-server/src/server.rs
// ============================================================================
// Module: Conformance HTTP Server
// Description: axum routes over the conformance service.
// Purpose: Expose validation, re-verification, and schema lookup over HTTP.
// Dependencies: axum, conformance-config, conformance-rules, tokio
// ============================================================================

//! ## Overview
//! The HTTP layer parses nothing beyond the raw body: each route checks the
//! body size, hands the bytes to [`ConformanceService`], maps the result onto
//! a status code, and records one `http_request` audit event.
//!
//! | Route | Operation |
//! |---|---|
//! | `POST /api/validate/{domain}` | flow validation with a signed report |
//! | `POST /api/validate-token` | report re-verification |
//! | `POST /api/validate-single-action` | one-call validation |
//! | `GET /api/validation-format/{domain}` | schema documents |
//! | `GET /health` | liveness |
//!
//! Security posture: inputs are untrusted; oversized bodies are rejected
//! before parsing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use conformance_config::ConformanceConfig;
use conformance_core::Attestor;
use conformance_core::LocalSigner;
use conformance_core::SystemClock;
use conformance_rules::Catalog;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::audit::HttpAuditEvent;
use crate::audit::HttpAuditEventParams;
use crate::audit::RequestOutcome;
use crate::audit::sink_from_config;
use crate::keys::ensure_key_pair;
use crate::keys::load_signing_key;
use crate::keys::load_verifying_key;
use crate::service::CallLabels;
use crate::service::ConformanceService;
use crate::service::ServiceError;
use crate::service::ServiceSettings;

// ============================================================================
// SECTION: Server
// ============================================================================

/// Conformance HTTP server instance.
#[derive(Debug)]
pub struct ConformanceServer {
    /// Listen address.
    bind: SocketAddr,
    /// Shared handler state.
    state: Arc<ServerState>,
}

impl ConformanceServer {
    /// Builds a server from configuration.
    ///
    /// Keys are loaded and checked against each other here; a missing or
    /// mismatched key fails startup.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the configuration, keys, catalog, or audit
    /// sink cannot be set up.
    pub fn from_config(config: &ConformanceConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let bind = config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let signing_key = load_signing_key(&config.signing.private_key_source())
            .map_err(|err| ServerError::Config(err.to_string()))?;
        let verifying_key = load_verifying_key(&config.signing.public_key_source())
            .map_err(|err| ServerError::Config(err.to_string()))?;
        ensure_key_pair(&signing_key, &verifying_key)
            .map_err(|err| ServerError::Config(err.to_string()))?;
        let catalog = Catalog::builtin().map_err(|err| ServerError::Init(err.to_string()))?;
        let audit = sink_from_config(&config.audit).map_err(|err| ServerError::Init(err.to_string()))?;
        let attestor = Attestor::new(Arc::new(LocalSigner::new(signing_key)), Arc::new(SystemClock));
        let service = ConformanceService::new(
            Arc::new(catalog),
            attestor,
            verifying_key,
            ServiceSettings::from_config(config),
            audit,
        );
        emit_exposure_warning(bind);
        Ok(Self::new(bind, service, config.server.max_body_bytes))
    }

    /// Creates a server around an already-built service.
    #[must_use]
    pub fn new(bind: SocketAddr, service: ConformanceService, max_body_bytes: usize) -> Self {
        Self {
            bind,
            state: Arc::new(ServerState {
                service,
                max_body_bytes,
            }),
        }
    }

    /// Returns the configured listen address.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Returns the route table.
    #[must_use]
    pub fn into_router(self) -> Router {
        router(self.state)
    }

    /// Binds the configured address and serves requests.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.bind)
            .await
            .map_err(|_| ServerError::Transport("http bind failed".to_string()))?;
        self.serve_on(listener).await
    }

    /// Serves requests on an already-bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when serving fails.
    pub async fn serve_on(self, listener: TcpListener) -> Result<(), ServerError> {
        axum::serve(listener, self.into_router())
            .await
            .map_err(|_| ServerError::Transport("http server failed".to_string()))
    }
}

/// Builds the route table over shared state.
fn router(state: Arc<ServerState>) -> Router {
    let body_limit = state.max_body_bytes.saturating_add(1);
    Router::new()
        .route("/api/validate/{domain}", post(handle_validate))
        .route("/api/validate-token", post(handle_validate_token))
        .route("/api/validate-single-action", post(handle_validate_single_action))
        .route("/api/validation-format/{domain}", get(handle_validation_format))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Shared state for HTTP handlers.
#[derive(Debug)]
struct ServerState {
    /// Conformance operations.
    service: ConformanceService,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

impl ServerState {
    /// Records one request audit event.
    fn record(&self, route: &'static str, status: StatusCode, request_bytes: usize, detail: AuditDetail) {
        self.service.audit().record(&HttpAuditEvent::new(HttpAuditEventParams {
            route,
            status: status.as_u16(),
            outcome: detail.outcome,
            error_kind: detail.error_kind,
            request_bytes,
            domain: detail.labels.domain,
            action: detail.labels.action,
        }));
    }

    /// Rejects bodies above the configured limit.
    fn check_size(&self, route: &'static str, bytes: &Bytes) -> Option<Response> {
        if bytes.len() <= self.max_body_bytes {
            return None;
        }
        let status = StatusCode::PAYLOAD_TOO_LARGE;
        self.record(route, status, bytes.len(), AuditDetail::error("payload_too_large"));
        Some(failure(status, "request body too large"))
    }
}

/// Per-request audit fields beyond route and status.
#[derive(Debug)]
struct AuditDetail {
    /// Request outcome.
    outcome: RequestOutcome,
    /// Error label for failed requests.
    error_kind: Option<&'static str>,
    /// Domain and action labels.
    labels: CallLabels,
}

impl AuditDetail {
    /// Detail for a request whose payload conformed.
    fn success() -> Self {
        Self {
            outcome: RequestOutcome::Success,
            error_kind: None,
            labels: CallLabels::default(),
        }
    }

    /// Detail for a request whose payload had defects.
    fn defects() -> Self {
        Self {
            outcome: RequestOutcome::Defects,
            ..Self::success()
        }
    }

    /// Detail for a failed request.
    fn error(kind: &'static str) -> Self {
        Self {
            outcome: RequestOutcome::Error,
            error_kind: Some(kind),
            labels: CallLabels::default(),
        }
    }

    /// Attaches domain and action labels.
    fn with_labels(mut self, labels: CallLabels) -> Self {
        self.labels = labels;
        self
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles `POST /api/validate/{domain}`.
async fn handle_validate(
    State(state): State<Arc<ServerState>>,
    Path(domain): Path<String>,
    bytes: Bytes,
) -> Response {
    const ROUTE: &str = "validate";
    if let Some(rejection) = state.check_size(ROUTE, &bytes) {
        return rejection;
    }
    let labels = CallLabels {
        domain: Some(domain.clone()),
        action: None,
    };
    match state.service.validate(&domain, &bytes).await {
        Ok(result) => {
            let status = StatusCode::OK;
            let detail =
                if result.signed.success { AuditDetail::success() } else { AuditDetail::defects() };
            state.record(ROUTE, status, bytes.len(), detail.with_labels(labels));
            (status, Json(result.signed)).into_response()
        }
        Err(err) => {
            let status = status_for(&err);
            state.record(ROUTE, status, bytes.len(), AuditDetail::error(err.kind()).with_labels(labels));
            failure(status, &err.to_string())
        }
    }
}

/// Handles `POST /api/validate-token`.
async fn handle_validate_token(State(state): State<Arc<ServerState>>, bytes: Bytes) -> Response {
    const ROUTE: &str = "validate_token";
    if let Some(rejection) = state.check_size(ROUTE, &bytes) {
        return rejection;
    }
    let Ok(body) = serde_json::from_slice::<Value>(&bytes) else {
        let status = StatusCode::BAD_REQUEST;
        state.record(ROUTE, status, bytes.len(), AuditDetail::error("malformed_request"));
        return failure(status, "request body must be json");
    };
    match state.service.validate_token(&body) {
        Ok(verdict) => {
            let status = StatusCode::OK;
            state.record(ROUTE, status, bytes.len(), AuditDetail::success());
            let body = json!({
                "success": true,
                "response": {"message": verdict.message, "verified": verdict.verified},
            });
            (status, Json(body)).into_response()
        }
        Err(err) => {
            let status = status_for(&err);
            state.record(ROUTE, status, bytes.len(), AuditDetail::error(err.kind()));
            failure(status, &err.to_string())
        }
    }
}

/// Handles `POST /api/validate-single-action`.
async fn handle_validate_single_action(
    State(state): State<Arc<ServerState>>,
    bytes: Bytes,
) -> Response {
    const ROUTE: &str = "validate_single_action";
    if let Some(rejection) = state.check_size(ROUTE, &bytes) {
        return rejection;
    }
    let Ok(body) = serde_json::from_slice::<Value>(&bytes) else {
        let status = StatusCode::BAD_REQUEST;
        state.record(ROUTE, status, bytes.len(), AuditDetail::error("malformed_request"));
        return error_field(status, &json!("provide transaction logs to verify"));
    };
    let labels = CallLabels::from_body(&body);
    match state.service.validate_single_action(&body) {
        Ok(defects) if defects.is_empty() => {
            let status = StatusCode::OK;
            state.record(ROUTE, status, bytes.len(), AuditDetail::success().with_labels(labels));
            (status, Json(json!({"success": true, "error": false}))).into_response()
        }
        Ok(defects) => {
            let status = StatusCode::BAD_REQUEST;
            state.record(ROUTE, status, bytes.len(), AuditDetail::defects().with_labels(labels));
            let defects = serde_json::to_value(&defects).unwrap_or(Value::Null);
            error_field(status, &defects)
        }
        Err(err) => {
            let status = status_for(&err);
            state.record(ROUTE, status, bytes.len(), AuditDetail::error(err.kind()).with_labels(labels));
            error_field(status, &json!(err.to_string()))
        }
    }
}

/// Query parameters of the validation-format route.
#[derive(Debug, Deserialize)]
struct FormatQuery {
    /// Full domain code.
    domain: Option<String>,
    /// Protocol core version.
    version: Option<String>,
}

/// Handles `GET /api/validation-format/{domain}`.
async fn handle_validation_format(
    State(state): State<Arc<ServerState>>,
    Path(segment): Path<String>,
    Query(query): Query<FormatQuery>,
) -> Response {
    const ROUTE: &str = "validation_format";
    let labels = CallLabels {
        domain: query.domain.clone(),
        action: None,
    };
    match state.service.validation_format(&segment, query.domain.as_deref(), query.version.as_deref()) {
        Ok(documents) => {
            let status = StatusCode::OK;
            state.record(ROUTE, status, 0, AuditDetail::success().with_labels(labels));
            (status, Json(json!({"success": true, "response": documents}))).into_response()
        }
        Err(err) => {
            let status = status_for(&err);
            state.record(ROUTE, status, 0, AuditDetail::error(err.kind()).with_labels(labels));
            error_field(status, &json!(err.to_string()))
        }
    }
}

/// Handles `GET /health`.
async fn handle_health() -> Response {
    (StatusCode::OK, Json(json!({"success": true, "status": "OK"}))).into_response()
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Maps a service error onto an HTTP status.
const fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::MalformedRequest(_)
        | ServiceError::UnsupportedDomain(_)
        | ServiceError::Dispatch(_)
        | ServiceError::Verification(_) => StatusCode::BAD_REQUEST,
        ServiceError::SignerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Builds a `{success: false, response: {message}}` body.
fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"success": false, "response": {"message": message}}))).into_response()
}

/// Builds a `{success: false, error}` body.
fn error_field(status: StatusCode, error: &Value) -> Response {
    (status, Json(json!({"success": false, "error": error}))).into_response()
}

/// Warns when the server listens beyond loopback.
fn emit_exposure_warning(bind: SocketAddr) {
    if !bind.ip().is_loopback() {
        let _ = writeln!(
            std::io::stderr(),
            "conformance-server: WARNING: listening on non-loopback address {bind} without \
             authentication; place the server behind an authenticating proxy"
        );
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server startup and transport errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration or key errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
