//! Config load validation tests for conformance-config.
// crates/conformance-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding, sections).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use conformance_config::AuditSinkKind;
use conformance_config::ConfigError;
use conformance_config::ConformanceConfig;
use conformance_config::DEFAULT_PUBLIC_KEY_ENV;
use conformance_config::DEFAULT_SIGNING_KEY_ENV;
use conformance_config::KeySource;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<ConformanceConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

fn write_config(content: &str) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(content.as_bytes()).map_err(|err| err.to_string())?;
    Ok(file)
}

// ============================================================================
// SECTION: Load Guards
// ============================================================================

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    assert_invalid(ConformanceConfig::load(Some(Path::new(&long_path))), "config path exceeds max length")
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    assert_invalid(
        ConformanceConfig::load(Some(Path::new(&long_component))),
        "config path component too long",
    )
}

#[test]
fn load_rejects_missing_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let missing = dir.path().join("absent.toml");
    assert_invalid(ConformanceConfig::load(Some(&missing)), "config io error")
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&vec![b'#'; 1_048_577]).map_err(|err| err.to_string())?;
    assert_invalid(ConformanceConfig::load(Some(file.path())), "config file exceeds size limit")
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(ConformanceConfig::load(Some(file.path())), "config file must be utf-8")
}

#[test]
fn load_rejects_unknown_keys() -> TestResult {
    let file = write_config("[server]\nbind = \"127.0.0.1:9000\"\nworkers = 4\n")?;
    assert_invalid(ConformanceConfig::load(Some(file.path())), "config parse error")
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

#[test]
fn empty_file_yields_defaults() -> TestResult {
    let file = write_config("")?;
    let config = ConformanceConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    let bind = config.server.bind_addr().map_err(|err| err.to_string())?;
    if bind.to_string() != "127.0.0.1:8080" {
        return Err(format!("unexpected bind {bind}"));
    }
    if config.signing.private_key_source() != KeySource::Env(DEFAULT_SIGNING_KEY_ENV.to_string()) {
        return Err("signing key should default to the environment".to_string());
    }
    if config.signing.public_key_source() != KeySource::Env(DEFAULT_PUBLIC_KEY_ENV.to_string()) {
        return Err("public key should default to the environment".to_string());
    }
    if config.signing.timeout() != Duration::from_secs(2) {
        return Err("unexpected default signing timeout".to_string());
    }
    if config.audit.sink != AuditSinkKind::Stderr {
        return Err("audit should default to stderr".to_string());
    }
    if config.validation.default_flow.is_some() || config.validation.max_reported_defects.is_some() {
        return Err("validation defaults should be unset".to_string());
    }
    ConformanceConfig::default().validate().map_err(|err| err.to_string())
}

#[test]
fn full_config_round_trips_every_section() -> TestResult {
    let file = write_config(
        r#"
[server]
bind = "0.0.0.0:7070"
max_body_bytes = 1048576

[signing]
private_key_path = "keys/signing.key"
public_key_env = "REPORT_PUBLIC_KEY"
timeout_ms = 500

[audit]
sink = "file"
path = "logs/audit.jsonl"

[validation]
default_flow = "retail-happy-path"
max_reported_defects = 50
"#,
    )?;
    let config = ConformanceConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.server.max_body_bytes != 1_048_576 {
        return Err("max_body_bytes not applied".to_string());
    }
    if config.signing.private_key_source() != KeySource::File(PathBuf::from("keys/signing.key")) {
        return Err("private key file not selected".to_string());
    }
    if config.signing.public_key_source() != KeySource::Env("REPORT_PUBLIC_KEY".to_string()) {
        return Err("public key env not applied".to_string());
    }
    if config.signing.timeout() != Duration::from_millis(500) {
        return Err("timeout not applied".to_string());
    }
    if config.audit.sink != AuditSinkKind::File {
        return Err("file sink not selected".to_string());
    }
    if config.validation.max_reported_defects != Some(50) {
        return Err("max_reported_defects not applied".to_string());
    }
    Ok(())
}

// ============================================================================
// SECTION: Section Validation
// ============================================================================

#[test]
fn invalid_bind_is_rejected() -> TestResult {
    assert_invalid(ConformanceConfig::from_toml("[server]\nbind = \"localhost\"\n"), "invalid bind address")
}

#[test]
fn body_limit_bounds_are_enforced() -> TestResult {
    assert_invalid(
        ConformanceConfig::from_toml("[server]\nmax_body_bytes = 0\n"),
        "max_body_bytes must be greater than zero",
    )?;
    assert_invalid(
        ConformanceConfig::from_toml("[server]\nmax_body_bytes = 1073741824\n"),
        "max_body_bytes must not exceed",
    )
}

#[test]
fn signing_timeout_bounds_are_enforced() -> TestResult {
    assert_invalid(
        ConformanceConfig::from_toml("[signing]\ntimeout_ms = 1\n"),
        "signing.timeout_ms must be between",
    )?;
    assert_invalid(
        ConformanceConfig::from_toml("[signing]\ntimeout_ms = 60000\n"),
        "signing.timeout_ms must be between",
    )
}

#[test]
fn signing_env_names_are_checked() -> TestResult {
    assert_invalid(
        ConformanceConfig::from_toml("[signing]\nprivate_key_env = \"signing key\"\n"),
        "signing.private_key_env must be an upper-case environment variable name",
    )
}

#[test]
fn file_sink_requires_path() -> TestResult {
    assert_invalid(
        ConformanceConfig::from_toml("[audit]\nsink = \"file\"\n"),
        "audit.path is required for the file sink",
    )
}

#[test]
fn validation_defaults_are_bounded() -> TestResult {
    assert_invalid(
        ConformanceConfig::from_toml("[validation]\nmax_reported_defects = 0\n"),
        "validation.max_reported_defects must be between",
    )?;
    assert_invalid(
        ConformanceConfig::from_toml("[validation]\ndefault_flow = \"  \"\n"),
        "validation.default_flow must be non-empty",
    )
}
