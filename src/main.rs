//! alloy-dosing - ladle alloy addition advisor
//!
//! Loads the plant config and the per-alloy models once, runs one dosing
//! request, and prints the JSON result on stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Request from a file
//! alloy-dosing recommend --request heat_4711.json --pretty
//!
//! # Request from stdin, with an audit trail
//! cat heat.json | alloy-dosing recommend --audit-log dosing_audit.jsonl
//!
//! # Check a config file without running anything
//! alloy-dosing --config plant.toml validate-config --print
//! ```
//!
//! # Environment Variables
//!
//! - `DOSING_CONFIG`: config file path when `--config` is not given
//! - `DOSING_MODELS_DIR`: overrides `models.dir`
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use alloy_dosing::{AuditRecord, DosingConfig, DosingOutcome, DosingPipeline, ModelRegistry};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "alloy-dosing")]
#[command(about = "Ladle alloy dosing recommendations from chemistry deltas")]
#[command(version)]
struct CliArgs {
    /// Config file (default: $DOSING_CONFIG, then ./dosing_config.toml, then built-ins)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute alloy additions for one request
    Recommend {
        /// Request JSON file, or "-" for stdin
        #[arg(long, default_value = "-", value_name = "FILE")]
        request: String,

        /// Directory holding <alloy>_model.json files
        #[arg(long, env = "DOSING_MODELS_DIR", value_name = "DIR")]
        models_dir: Option<PathBuf>,

        /// Append an audit record (JSON line) to this file
        #[arg(long, value_name = "FILE")]
        audit_log: Option<PathBuf>,

        /// Caller recorded in the audit log
        #[arg(long)]
        caller: Option<String>,

        /// Pretty-print the result
        #[arg(long)]
        pretty: bool,
    },

    /// Load and validate the config, then exit
    ValidateConfig {
        /// Print the effective config as TOML
        #[arg(long)]
        print: bool,
    },
}

// ============================================================================
// Helpers
// ============================================================================

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// An explicit `--config` must load; otherwise fall back through the search order.
fn load_config(path: Option<&Path>) -> Result<DosingConfig> {
    match path {
        Some(p) => DosingConfig::load_from_file(p)
            .with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(DosingConfig::load()),
    }
}

fn read_request(source: &str) -> Result<String> {
    if source == "-" {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .context("Failed to read request from stdin")?;
        Ok(body)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read request {source}"))
    }
}

// ============================================================================
// Commands
// ============================================================================

fn run_recommend(
    config: DosingConfig,
    request: &str,
    models_dir: Option<PathBuf>,
    audit_log: Option<&Path>,
    caller: Option<&str>,
    pretty: bool,
) -> Result<ExitCode> {
    let mut config = config;
    if let Some(dir) = models_dir {
        config.models.dir = dir;
    }

    let registry = ModelRegistry::load_from_dir(&config.models.dir, config.alloy_ids())
        .context("Model loading failed")?;
    let pipeline = DosingPipeline::new(Arc::new(config), Arc::new(registry))
        .context("Pipeline construction failed")?;

    let body = read_request(request)?;
    let started = Instant::now();
    let outcome = pipeline.handle_json_str(&body);
    let elapsed = started.elapsed();

    if let Some(path) = audit_log {
        let request_value =
            serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body.clone()));
        if let Err(e) =
            AuditRecord::from_outcome(&request_value, &outcome, elapsed, caller).append_jsonl(path)
        {
            warn!(error = %e, "Audit log write failed");
        }
    }

    let rendered = if pretty {
        serde_json::to_string_pretty(&outcome)?
    } else {
        serde_json::to_string(&outcome)?
    };
    println!("{rendered}");

    Ok(match outcome {
        DosingOutcome::Success(_) => ExitCode::SUCCESS,
        DosingOutcome::Error { .. } => ExitCode::FAILURE,
    })
}

fn run_validate_config(config: &DosingConfig, print: bool) -> Result<ExitCode> {
    config.validate()?;
    info!(
        plant = %config.plant.name,
        alloys = config.alloys.len(),
        elements = config.chemistry.elements.len(),
        "Config OK"
    );
    if print {
        print!("{}", config.to_toml()?);
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<ExitCode> {
    let args = CliArgs::parse();
    init_logging(args.log_json);

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Recommend {
            request,
            models_dir,
            audit_log,
            caller,
            pretty,
        } => run_recommend(
            config,
            &request,
            models_dir,
            audit_log.as_deref(),
            caller.as_deref(),
            pretty,
        ),
        Command::ValidateConfig { print } => run_validate_config(&config, print),
    }
}
