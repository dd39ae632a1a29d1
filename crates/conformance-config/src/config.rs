// crates/conformance-config/src/config.rs
// ============================================================================
// Module: Conformance Gate Configuration
// Description: Configuration loading and validation for the conformance server.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults, so an empty file is a valid configuration;
//! anything present but out of range fails the load.
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "conformance.toml";
/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "CONFORMANCE_CONFIG";
/// Maximum config file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default bind address.
pub(crate) const DEFAULT_BIND: &str = "127.0.0.1:8080";
/// Default request body limit.
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;
/// Upper bound for the request body limit.
pub(crate) const MAX_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;
/// Default environment variable carrying the signing key.
pub const DEFAULT_SIGNING_KEY_ENV: &str = "CONFORMANCE_SIGNING_KEY";
/// Default environment variable carrying the verifying key.
pub const DEFAULT_PUBLIC_KEY_ENV: &str = "CONFORMANCE_PUBLIC_KEY";
/// Maximum environment variable name length.
pub(crate) const MAX_ENV_NAME_LENGTH: usize = 128;
/// Default signing timeout.
pub(crate) const DEFAULT_SIGN_TIMEOUT_MS: u64 = 2_000;
/// Minimum signing timeout.
pub(crate) const MIN_SIGN_TIMEOUT_MS: u64 = 10;
/// Maximum signing timeout.
pub(crate) const MAX_SIGN_TIMEOUT_MS: u64 = 30_000;
/// Maximum flow identifier length.
pub(crate) const MAX_FLOW_ID_LENGTH: usize = 128;
/// Upper bound for defects reported per action.
pub(crate) const MAX_REPORTED_DEFECTS: usize = 10_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Conformance server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConformanceConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Report signing configuration.
    #[serde(default)]
    pub signing: SigningConfig,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Validation defaults.
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl ConformanceConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit path, then [`CONFIG_ENV_VAR`], then
    /// `conformance.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.signing.validate()?;
        self.audit.validate()?;
        self.validation.validate()?;
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (`host:port`).
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let bind = self.bind.trim();
        if bind.is_empty() {
            return Err(ConfigError::Invalid("server.bind must be non-empty".to_string()));
        }
        bind.parse().map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_MAX_BODY_BYTES {
            return Err(ConfigError::Invalid(format!(
                "max_body_bytes must not exceed {MAX_MAX_BODY_BYTES}"
            )));
        }
        Ok(())
    }
}

/// Where a key is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// File holding raw or base64 key bytes.
    File(PathBuf),
    /// Environment variable holding base64 key bytes.
    Env(String),
}

/// Report signing configuration.
///
/// A file path takes precedence over an environment variable for the same key.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigningConfig {
    /// Signing key file.
    #[serde(default)]
    pub private_key_path: Option<String>,
    /// Environment variable carrying the base64 signing key.
    #[serde(default = "default_signing_key_env")]
    pub private_key_env: String,
    /// Verifying key file.
    #[serde(default)]
    pub public_key_path: Option<String>,
    /// Environment variable carrying the base64 verifying key.
    #[serde(default = "default_public_key_env")]
    pub public_key_env: String,
    /// Upper bound on one signing call, in milliseconds.
    #[serde(default = "default_sign_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            private_key_path: None,
            private_key_env: default_signing_key_env(),
            public_key_path: None,
            public_key_env: default_public_key_env(),
            timeout_ms: default_sign_timeout_ms(),
        }
    }
}

impl SigningConfig {
    /// Returns the signing key source.
    #[must_use]
    pub fn private_key_source(&self) -> KeySource {
        key_source(self.private_key_path.as_deref(), &self.private_key_env)
    }

    /// Returns the verifying key source.
    #[must_use]
    pub fn public_key_source(&self) -> KeySource {
        key_source(self.public_key_path.as_deref(), &self.public_key_env)
    }

    /// Returns the signing timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates signing configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.private_key_path {
            validate_path_string("signing.private_key_path", path)?;
        }
        if let Some(path) = &self.public_key_path {
            validate_path_string("signing.public_key_path", path)?;
        }
        validate_env_name("signing.private_key_env", &self.private_key_env)?;
        validate_env_name("signing.public_key_env", &self.public_key_env)?;
        if !(MIN_SIGN_TIMEOUT_MS ..= MAX_SIGN_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "signing.timeout_ms must be between {MIN_SIGN_TIMEOUT_MS} and \
                 {MAX_SIGN_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// Append-only JSON lines file.
    File,
    /// Discard events.
    None,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink receiving audit events.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Audit log path, required for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        if self.sink == AuditSinkKind::File && self.path.is_none() {
            return Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()));
        }
        Ok(())
    }
}

/// Validation defaults applied when a request leaves them out.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    /// Flow identifier used when a request names none.
    #[serde(default)]
    pub default_flow: Option<String>,
    /// Cap on defect paths reported per action.
    #[serde(default)]
    pub max_reported_defects: Option<usize>,
}

impl ValidationConfig {
    /// Validates validation defaults.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(flow) = &self.default_flow {
            let trimmed = flow.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::Invalid(
                    "validation.default_flow must be non-empty".to_string(),
                ));
            }
            if trimmed.len() > MAX_FLOW_ID_LENGTH {
                return Err(ConfigError::Invalid(
                    "validation.default_flow exceeds max length".to_string(),
                ));
            }
        }
        if let Some(limit) = self.max_reported_defects
            && (limit == 0 || limit > MAX_REPORTED_DEFECTS)
        {
            return Err(ConfigError::Invalid(format!(
                "validation.max_reported_defects must be between 1 and {MAX_REPORTED_DEFECTS}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an environment variable name (`[A-Z_][A-Z0-9_]*`).
fn validate_env_name(field: &str, value: &str) -> Result<(), ConfigError> {
    let valid = !value.is_empty()
        && value.len() <= MAX_ENV_NAME_LENGTH
        && !value.starts_with(|ch: char| ch.is_ascii_digit())
        && value.chars().all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{field} must be an upper-case environment variable name")))
    }
}

/// Picks the file source when configured, else the environment variable.
fn key_source(path: Option<&str>, env_name: &str) -> KeySource {
    path.map_or_else(
        || KeySource::Env(env_name.to_string()),
        |path| KeySource::File(PathBuf::from(path.trim())),
    )
}

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default request body limit.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default signing key environment variable.
fn default_signing_key_env() -> String {
    DEFAULT_SIGNING_KEY_ENV.to_string()
}

/// Default verifying key environment variable.
fn default_public_key_env() -> String {
    DEFAULT_PUBLIC_KEY_ENV.to_string()
}

/// Default signing timeout.
const fn default_sign_timeout_ms() -> u64 {
    DEFAULT_SIGN_TIMEOUT_MS
}

// ============================================================================
// SECTION: Tests
// ============================================================================
