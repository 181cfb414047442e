// crates/warden-cli/src/main.rs
// ============================================================================
// Module: Governance Kernel CLI Entry Point
// Description: Thin command dispatcher binding the kernel's inbound
//              interfaces (validate, approval issue/consume, execute,
//              evidence verify, config check) to a terminal.
// Purpose: Give an operator or script a local way to drive the governance
//          kernel without writing a host process.
// Dependencies: clap, serde_json, warden-approvals, warden-config,
//               warden-core, warden-evidence, warden-executor, warden-gateway,
//               warden-governor, warden-store-sqlite
// ============================================================================

//! ## Overview
//! This binary is a binding, not a second implementation: every subcommand
//! parses its input, calls straight into the crate that owns the decision,
//! and prints the result as JSON. Business logic lives in `warden-core`,
//! `warden-approvals`, `warden-governor`, `warden-executor`, `warden-evidence`,
//! and `warden-gateway`; this crate owns only argument parsing, store/sink
//! wiring from [`warden_config::GovernanceConfig`], and output formatting.

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "this binary's entire contract with its caller is JSON on stdout and errors on stderr"
)]

use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use thiserror::Error;
use warden_approvals::ApprovalLedger;
use warden_approvals::ApprovalStore;
use warden_approvals::InMemoryApprovalStore;
use warden_config::ConfigError;
use warden_config::GovernanceConfig;
use warden_core::Clock;
use warden_core::Ir;
use warden_core::SystemClock;
use warden_core::TenantId;
use warden_core::Timestamp;
use warden_core::validate;
use warden_evidence::EvidenceReader;
use warden_evidence::EvidenceSink;
use warden_evidence::FileSink;
use warden_evidence::verify_pack;
use warden_executor::GraphSpec;
use warden_gateway::ExecuteRequest;
use warden_gateway::GatewayOrchestrator;
use warden_gateway::IrGovernanceMode;
use warden_store_sqlite::SqliteStore;

/// Governance kernel command-line interface.
#[derive(Parser, Debug)]
#[command(name = "warden", about = "Governance kernel command-line interface", disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand.
    #[command(subcommand)]
    command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Validates an IR plan and prints its risk tier and disposition.
    Validate(ValidateArgs),
    /// Approval ledger operations.
    Approval {
        /// Selected approval subcommand.
        #[command(subcommand)]
        command: ApprovalCommand,
    },
    /// Runs a compiled graph through the gateway orchestrator.
    Execute(ExecuteArgs),
    /// Evidence pack operations.
    Evidence {
        /// Selected evidence subcommand.
        #[command(subcommand)]
        command: EvidenceCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `validate`.
#[derive(clap::Args, Debug)]
struct ValidateArgs {
    /// Path to a JSON file containing the IR plan.
    #[arg(long)]
    ir: PathBuf,
}

/// Approval ledger subcommands.
#[derive(Subcommand, Debug)]
enum ApprovalCommand {
    /// Issues a new single-use approval token.
    Create {
        /// Owning tenant.
        #[arg(long)]
        tenant: String,
        /// Canonical hash of the IR this approval authorizes.
        #[arg(long)]
        ir_hash: String,
        /// Time-to-live, in seconds; defaults to the configured value.
        #[arg(long)]
        ttl_seconds: Option<i64>,
        /// Identity of whoever is issuing this approval.
        #[arg(long)]
        created_by: Option<String>,
        /// Path to the governance configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Consumes a previously issued approval token.
    Consume {
        /// Owning tenant.
        #[arg(long)]
        tenant: String,
        /// Canonical hash of the IR this token authorizes.
        #[arg(long)]
        ir_hash: String,
        /// Raw token, as returned by `approval create`.
        #[arg(long)]
        token: String,
        /// Identity of whoever is consuming this approval.
        #[arg(long)]
        consumed_by: Option<String>,
        /// Path to the governance configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Arguments for `execute`.
#[derive(clap::Args, Debug)]
struct ExecuteArgs {
    /// Path to a JSON file containing the compiled execution graph.
    #[arg(long)]
    graph: PathBuf,
    /// Path to a JSON file containing the IR the graph was compiled from.
    /// Required unless `--no-ir-governance` is given.
    #[arg(long)]
    ir: Option<PathBuf>,
    /// Disables IR governance (validation, approval, diff-audit) for this
    /// call; runs the graph as given.
    #[arg(long)]
    no_ir_governance: bool,
    /// Raw approval token, required only when validation escalates.
    #[arg(long)]
    approval_token: Option<String>,
    /// Identity of whoever is consuming an approval token, if any.
    #[arg(long)]
    actor: Option<String>,
    /// Forces execution even if the graph was compiled as a dry run.
    #[arg(long)]
    execute: bool,
    /// Directory evidence packs are written to.
    #[arg(long, default_value = "./evidence")]
    evidence_dir: PathBuf,
    /// Path to the governance configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Evidence subcommands.
#[derive(Subcommand, Debug)]
enum EvidenceCommand {
    /// Verifies a previously written evidence pack's content hash.
    Verify {
        /// Reference returned by `execute` (the pack id).
        #[arg(long)]
        reference: String,
        /// Directory evidence packs were written to.
        #[arg(long, default_value = "./evidence")]
        evidence_dir: PathBuf,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Loads and validates a configuration file.
    Check {
        /// Path to the governance configuration file.
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Prints the canonical example configuration.
    Example,
    /// Prints the configuration schema document as JSON.
    Schema,
    /// Writes (or prints) the configuration reference documentation.
    Docs {
        /// Path to write the rendered documentation to; prints to stdout
        /// when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Errors surfaced by this binary.
#[derive(Debug, Error)]
enum CliError {
    /// Reading an input file failed.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Parsing an input file as JSON failed.
    #[error("failed to parse {path} as json: {source}")]
    Json {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// Loading the configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The approval ledger rejected the request.
    #[error(transparent)]
    Ledger(#[from] warden_approvals::ledger::LedgerError),
    /// The gateway rejected or failed the request.
    #[error(transparent)]
    Gateway(#[from] warden_gateway::GatewayError),
    /// The evidence sink failed.
    #[error(transparent)]
    Sink(#[from] warden_evidence::SinkError),
    /// The evidence pack's canonical hash could not be recomputed.
    #[error(transparent)]
    Canonical(#[from] warden_core::core::canonical::CanonicalError),
    /// The durable store backend failed to open.
    #[error(transparent)]
    Store(#[from] warden_store_sqlite::SqliteStoreError),
    /// Docs generation or verification failed.
    #[error(transparent)]
    Docs(#[from] warden_config::DocsError),
    /// An IR identified a tenant whose approval target tenant differs.
    #[error("tenant_id {given} is not a valid tenant identifier: {reason}")]
    InvalidTenant {
        /// The value supplied on the command line.
        given: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Process entry point: parses argv and dispatches to the selected subcommand.
fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "command failed");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Dispatches a parsed [`Command`] to its handler.
fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Validate(args) => run_validate(&args),
        Command::Approval { command } => run_approval(command),
        Command::Execute(args) => run_execute(&args),
        Command::Evidence { command } => run_evidence(command),
        Command::Config { command } => run_config(command),
    }
}

/// Handles `warden validate`.
fn run_validate(args: &ValidateArgs) -> Result<(), CliError> {
    let ir: Ir = read_json(&args.ir)?;
    let result = validate(&ir, SystemClock.now());
    print_json(&result);
    Ok(())
}

/// Handles `warden approval create|consume`.
fn run_approval(command: ApprovalCommand) -> Result<(), CliError> {
    match command {
        ApprovalCommand::Create { tenant, ir_hash, ttl_seconds, created_by, config } => {
            let config = load_config(config.as_deref())?;
            let tenant_id = parse_tenant(&tenant)?;
            let ledger = build_ledger(&config)?;
            let ttl = ttl_seconds.unwrap_or(config.approval.default_ttl_seconds);
            let (approval, raw_token, _event) = ledger.create(tenant_id, ir_hash, ttl, created_by)?;
            print_json(&ApprovalCreated { approval_id: approval.approval_id.to_string(), token: raw_token, expires_at: approval.expires_at });
        }
        ApprovalCommand::Consume { tenant, ir_hash, token, consumed_by, config } => {
            let config = load_config(config.as_deref())?;
            let tenant_id = parse_tenant(&tenant)?;
            let ledger = build_ledger(&config)?;
            let (result, _event) = ledger.consume(&tenant_id, &ir_hash, &token, consumed_by)?;
            print_json(&result);
        }
    }
    Ok(())
}

/// Handles `warden execute`.
fn run_execute(args: &ExecuteArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let graph_spec: GraphSpec = read_json(&args.graph)?;
    let ir = args.ir.as_deref().map(read_json::<Ir>).transpose()?;

    let clock = Arc::new(SystemClock);
    let approval_store = build_store(&config)?;
    let ledger = Arc::new(ApprovalLedger::new(approval_store, Arc::clone(&clock)));
    std::fs::create_dir_all(&args.evidence_dir)
        .map_err(|source| CliError::Read { path: args.evidence_dir.clone(), source })?;
    let sink: Arc<dyn EvidenceSink> = Arc::new(FileSink::new(&args.evidence_dir)?);

    let mode = if args.no_ir_governance { IrGovernanceMode::Off } else { IrGovernanceMode::On };
    let orchestrator = GatewayOrchestrator::new(mode, ledger, sink, None, Some(config.governor_policy()), clock, false);

    let request = ExecuteRequest {
        tenant_id: graph_spec_tenant(ir.as_ref(), &graph_spec)?,
        graph_spec,
        ir,
        approval_token: args.approval_token.clone(),
        actor: args.actor.clone(),
        execute: args.execute,
    };
    let response = orchestrator.handle(request)?;
    print_json(&ExecuteSummary { gateway_result: &response.gateway_result, pack_id: response.evidence_pack.pack_id.clone() });
    Ok(())
}

/// Handles `warden evidence verify`.
fn run_evidence(command: EvidenceCommand) -> Result<(), CliError> {
    match command {
        EvidenceCommand::Verify { reference, evidence_dir } => {
            let sink = FileSink::new(&evidence_dir)?;
            let pack = sink.read(&reference)?;
            let faithful = verify_pack(&pack)?;
            print_json(&EvidenceVerification { reference, faithful });
        }
    }
    Ok(())
}

/// Handles `warden config check|example|schema|docs`.
fn run_config(command: ConfigCommand) -> Result<(), CliError> {
    match command {
        ConfigCommand::Check { path } => {
            let config = load_config(path.as_deref())?;
            print_json(&config);
        }
        ConfigCommand::Example => println!("{}", warden_config::config_toml_example()),
        ConfigCommand::Schema => print_json(&warden_config::config_schema()),
        ConfigCommand::Docs { out } => match out {
            Some(path) => warden_config::write_config_docs(&path)?,
            None => println!("{}", warden_config::config_docs_markdown()),
        },
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads the governance configuration from `path`, or the built-in
/// defaults when no path is given.
fn load_config(path: Option<&Path>) -> Result<GovernanceConfig, CliError> {
    match path {
        Some(path) => Ok(GovernanceConfig::load(Some(path))?),
        None => Ok(GovernanceConfig::default()),
    }
}

/// Builds the approval store backend selected by `config.store`.
fn build_store(config: &GovernanceConfig) -> Result<Arc<dyn ApprovalStore>, CliError> {
    match config.store.to_sqlite_config() {
        Some(sqlite_config) => Ok(Arc::new(SqliteStore::open(sqlite_config)?)),
        None => Ok(Arc::new(InMemoryApprovalStore::new())),
    }
}

/// Builds an [`ApprovalLedger`] over `config`'s selected store backend.
fn build_ledger(config: &GovernanceConfig) -> Result<ApprovalLedger, CliError> {
    let store = build_store(config)?;
    Ok(ApprovalLedger::new(store, Arc::new(SystemClock)))
}

/// Parses a command-line tenant argument into a [`TenantId`].
fn parse_tenant(raw: &str) -> Result<TenantId, CliError> {
    TenantId::parse(raw).map_err(|err| CliError::InvalidTenant { given: raw.to_string(), reason: err.to_string() })
}

/// Resolves the tenant a graph executes on behalf of: the IR's tenant when
/// IR governance is on, otherwise the graph's own nodes carry no tenant so a
/// fixed operator tenant is used for the dry-run-only path.
fn graph_spec_tenant(ir: Option<&Ir>, _graph_spec: &GraphSpec) -> Result<TenantId, CliError> {
    match ir {
        Some(ir) => Ok(ir.tenant_id.clone()),
        None => parse_tenant("cli-operator"),
    }
}

/// Reads and parses a JSON file at `path`.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read { path: path.to_path_buf(), source })?;
    serde_json::from_str(&text).map_err(|source| CliError::Json { path: path.to_path_buf(), source })
}

/// Prints `value` to stdout as pretty-printed JSON.
fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(error) => tracing::error!(error = %error, "failed to serialize output"),
    }
}

/// Output of `approval create`: the raw token is printed exactly once.
#[derive(Serialize)]
struct ApprovalCreated {
    /// Id of the newly created approval record.
    approval_id: String,
    /// Raw token; not recoverable after this response.
    token: String,
    /// When this approval expires if never consumed.
    expires_at: Timestamp,
}

/// Output of `execute`: a compact summary rather than the full evidence pack.
#[derive(Serialize)]
struct ExecuteSummary<'a> {
    /// The gateway's disposition for this call.
    gateway_result: &'a warden_gateway::GatewayResult,
    /// Id of the evidence pack written for this run.
    pack_id: String,
}

/// Output of `evidence verify`.
#[derive(Serialize)]
struct EvidenceVerification {
    /// The pack reference that was verified.
    reference: String,
    /// Whether the recomputed content hash matched.
    faithful: bool,
}
