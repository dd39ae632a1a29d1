// crates/conformance-cli/src/main.rs
// ============================================================================
// Module: Conformance Gate CLI Entry Point
// Description: Command dispatcher for the server and offline workflows.
// Purpose: Serve the HTTP API, manage keys, and validate or verify offline.
// Dependencies: clap, conformance-core, conformance-rules, conformance-server, tokio
// ============================================================================

//! ## Overview
//! The CLI runs the conformance server (`serve`), generates an Ed25519 key
//! pair (`keygen`), re-verifies a signed report (`verify`), and validates a
//! flow without signing (`check`). Offline commands exit non-zero when the
//! report does not verify or the flow has defects.
//!
//! Security posture: input files are untrusted and read with size limits.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use conformance_config::ConformanceConfig;
use conformance_config::KeySource;
use conformance_core::ActionDefects;
use conformance_core::CoreVersion;
use conformance_core::DomainCode;
use conformance_core::DomainFamily;
use conformance_core::FlowId;
use conformance_core::ValidationMode;
use conformance_core::ValidationSession;
use conformance_core::VerificationRequest;
use conformance_core::validate_flow;
use conformance_rules::Catalog;
use conformance_server::ConformanceServer;
use conformance_server::keys::encode_key;
use conformance_server::keys::load_verifying_key;
use conformance_server::service::SIGNATURE_INVALID;
use conformance_server::service::SIGNATURE_VERIFIED;
use ed25519_dalek::SECRET_KEY_LENGTH;
use ed25519_dalek::SigningKey;
use rand::RngCore;
use rand::rngs::OsRng;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a report or flow input file.
const MAX_INPUT_BYTES: usize = 16 * 1024 * 1024;
/// File name of the generated signing key.
const SIGNING_KEY_FILE: &str = "signing.key";
/// File name of the generated public key.
const PUBLIC_KEY_FILE: &str = "public.key";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "conformance-gate", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the conformance HTTP server.
    Serve(ServeCommand),
    /// Generate an Ed25519 signing key pair.
    Keygen(KeygenCommand),
    /// Re-verify a signed validation report.
    Verify(VerifyCommand),
    /// Validate a flow offline without signing.
    Check(CheckCommand),
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to conformance.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for the `keygen` command.
#[derive(Args, Debug)]
struct KeygenCommand {
    /// Directory receiving `signing.key` and `public.key`.
    #[arg(long, value_name = "DIR")]
    out_dir: PathBuf,
    /// Overwrite existing key files.
    #[arg(long, action = ArgAction::SetTrue)]
    force: bool,
}

/// Arguments for the `verify` command.
#[derive(Args, Debug)]
struct VerifyCommand {
    /// Signed report JSON (`success`, `response`, `signature`, `signTimestamp`).
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Public key file (raw 32 bytes or base64).
    #[arg(long, value_name = "PATH")]
    public_key: PathBuf,
}

/// Arguments for the `check` command.
#[derive(Args, Debug)]
struct CheckCommand {
    /// Validation request JSON (`domain`, `version`, `payload`, optional `flow`).
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Flow identifier overriding the one in the input.
    #[arg(long, value_name = "ID")]
    flow: Option<String>,
    /// Report schema defects only.
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "business_only")]
    schema_only: bool,
    /// Report business defects only.
    #[arg(long, action = ArgAction::SetTrue)]
    business_only: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Errors raised by bounded file reads.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// File could not be opened or read.
    #[error("{0}")]
    Io(std::io::Error),
    /// File exceeds the size limit.
    #[error("file exceeds size limit ({size} > {limit} bytes)")]
    TooLarge {
        /// Observed size.
        size: u64,
        /// Allowed size.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Keygen(command) => command_keygen(&command),
        Commands::Verify(command) => command_verify(&command),
        Commands::Check(command) => command_check(&command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = ConformanceConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let server = tokio::task::spawn_blocking(move || ConformanceServer::from_config(&config))
        .await
        .map_err(|err| CliError::new(format!("server init failed: init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    write_stderr_line(&format!("conformance-gate: listening on {}", server.bind_addr()))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Keygen Command
// ============================================================================

/// Executes the `keygen` command.
fn command_keygen(command: &KeygenCommand) -> CliResult<ExitCode> {
    let (signing_path, public_path) = generate_key_pair(&command.out_dir, command.force)?;
    write_stdout_line(&format!("signing key: {}", signing_path.display()))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line(&format!("public key: {}", public_path.display()))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Writes a fresh base64 key pair into a directory.
fn generate_key_pair(out_dir: &Path, force: bool) -> CliResult<(PathBuf, PathBuf)> {
    let signing_path = out_dir.join(SIGNING_KEY_FILE);
    let public_path = out_dir.join(PUBLIC_KEY_FILE);
    if !force && (signing_path.exists() || public_path.exists()) {
        return Err(CliError::new(format!(
            "refusing to overwrite existing keys in {} (use --force)",
            out_dir.display()
        )));
    }
    fs::create_dir_all(out_dir).map_err(|err| {
        CliError::new(format!("failed to create {}: {err}", out_dir.display()))
    })?;

    let mut seed = [0u8; SECRET_KEY_LENGTH];
    OsRng.fill_bytes(&mut seed);
    let key = SigningKey::from_bytes(&seed);
    write_key_file(&signing_path, &encode_key(&key.to_bytes()), true)?;
    write_key_file(&public_path, &encode_key(key.verifying_key().as_bytes()), false)?;
    Ok((signing_path, public_path))
}

/// Writes one key file, restricting access to private keys.
fn write_key_file(path: &Path, text: &str, private: bool) -> CliResult<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    if private {
        restrict_permissions(&mut options);
    }
    let mut file = options
        .open(path)
        .map_err(|err| CliError::new(format!("failed to write {}: {err}", path.display())))?;
    writeln!(file, "{text}")
        .map_err(|err| CliError::new(format!("failed to write {}: {err}", path.display())))
}

/// Limits a new file to its owner.
#[cfg(unix)]
fn restrict_permissions(options: &mut OpenOptions) {
    use std::os::unix::fs::OpenOptionsExt;
    options.mode(0o600);
}

/// Limits a new file to its owner.
#[cfg(not(unix))]
const fn restrict_permissions(_options: &mut OpenOptions) {}

// ============================================================================
// SECTION: Verify Command
// ============================================================================

/// Executes the `verify` command.
fn command_verify(command: &VerifyCommand) -> CliResult<ExitCode> {
    let verified = verify_file(&command.input, &command.public_key)?;
    let message = if verified { SIGNATURE_VERIFIED } else { SIGNATURE_INVALID };
    write_json(&json!({"verified": verified, "message": message}))?;
    Ok(if verified { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Verifies a signed report file against a public key file.
fn verify_file(input: &Path, public_key: &Path) -> CliResult<bool> {
    let body = read_json(input)?;
    let request = VerificationRequest::from_value(&body)
        .map_err(|err| CliError::new(err.to_string()))?;
    let key = load_verifying_key(&KeySource::File(public_key.to_path_buf()))
        .map_err(|err| CliError::new(err.to_string()))?;
    request.verify(&key).map_err(|err| CliError::new(err.to_string()))
}

// ============================================================================
// SECTION: Check Command
// ============================================================================

/// Executes the `check` command.
fn command_check(command: &CheckCommand) -> CliResult<ExitCode> {
    let request = read_json(&command.input)?;
    let mode = mode_from_flags(command.schema_only, command.business_only);
    let defects = check_flow(&request, command.flow.as_deref(), mode)?;
    let clean = defects.is_empty();
    write_json(&json!({"success": clean, "report": defects}))?;
    Ok(if clean { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Maps the bucket flags onto a validation mode.
const fn mode_from_flags(schema_only: bool, business_only: bool) -> ValidationMode {
    if schema_only {
        ValidationMode::SchemaOnly
    } else if business_only {
        ValidationMode::BusinessOnly
    } else {
        ValidationMode::Merged
    }
}

/// Validates a flow request against the built-in catalog.
fn check_flow(
    request: &Value,
    flow_override: Option<&str>,
    mode: ValidationMode,
) -> CliResult<ActionDefects> {
    let field = |name: &str| request.get(name).and_then(Value::as_str);
    let (Some(domain), Some(version), Some(flow)) =
        (field("domain"), field("version"), request.get("payload").and_then(Value::as_object))
    else {
        return Err(CliError::new(
            "input must contain domain, version, and an object payload".to_string(),
        ));
    };
    let domain = DomainCode::new(domain);
    let family = DomainFamily::from_domain_code(&domain)
        .ok_or_else(|| CliError::new(format!("domain not supported: {domain}")))?;
    let catalog = Catalog::builtin().map_err(|err| CliError::new(err.to_string()))?;
    let registry = catalog
        .actions(family)
        .ok_or_else(|| CliError::new(format!("domain not supported: {domain}")))?;

    let version = CoreVersion::new(version);
    let flow_id = flow_override.or_else(|| field("flow")).map(FlowId::new);
    let mut session = ValidationSession::for_flow(flow_id, version.clone(), domain.clone());
    let report = validate_flow(registry, &version, &domain, flow, &mut session)
        .map_err(|err| CliError::new(err.to_string()))?;
    Ok(report.defects(mode, None))
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Reads and parses a JSON input file.
fn read_json(path: &Path) -> CliResult<Value> {
    let bytes = read_bytes_with_limit(path, MAX_INPUT_BYTES)
        .map_err(|err| CliError::new(format!("failed to read {}: {err}", path.display())))?;
    serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("invalid json in {}: {err}", path.display())))
}

/// Reads a file, failing when it exceeds `max_bytes`.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Writes a pretty-printed JSON value to stdout.
fn write_json(value: &Value) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to render json: {err}")))?;
    write_stdout_line(&text).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
