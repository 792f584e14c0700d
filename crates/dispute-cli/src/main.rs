//! dispute-cli — run dispute scenarios against a ledger, inspect histories,
//! and emit JSON Schemas for downstream consumers.
//!
//! ```bash
//! # Evaluate a scenario against an on-disk ledger
//! dispute-cli --ledger-dir ./ledger evaluate scenario.json
//!
//! # Print and audit a dispute's history
//! dispute-cli --ledger-dir ./ledger history acme-2024-001
//!
//! # Emit schemas for the letter generator and UI
//! dispute-cli schema
//! ```

mod scenario;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use enforcement::{
    DisputeEngine, EngineConfig, EvaluationOutcome, ExaminerCheckResult, LedgerEntry,
    LoggedResponse, RemedyPlan, ReplaySummary, ResponseLayerViolation, Violation,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML engine configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ledger directory (overrides DISPUTE_LEDGER_DIR)
    #[arg(long)]
    ledger_dir: Option<PathBuf>,

    /// Tier at which disputes freeze, 1 to 3 (overrides DISPUTE_LOCK_THRESHOLD)
    #[arg(long)]
    lock_threshold: Option<u8>,

    /// Pretty-print JSON output
    #[arg(long, default_value_t = false)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a JSON scenario file and print one report per step
    Evaluate {
        scenario: PathBuf,
    },
    /// Print a dispute's ledger and audit it
    History {
        dispute_id: String,
    },
    /// Emit JSON Schemas of the engine's outward types
    Schema,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dispute_cli=info,enforcement=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match &args.command {
        Command::Evaluate { scenario } => {
            let engine = build_engine(&args)?;
            let scenario = scenario::Scenario::load(scenario)?;
            for report in scenario::run(&engine, &scenario)? {
                print_json(&report, args.pretty)?;
            }
        }
        Command::History { dispute_id } => {
            let config = load_config(&args)?;
            if config.ledger_dir.is_none() {
                bail!("history needs --ledger-dir or DISPUTE_LEDGER_DIR");
            }
            let engine = DisputeEngine::from_config(config)?;
            let entries = engine.history(dispute_id)?;
            if entries.is_empty() {
                bail!("no ledger entries for dispute {}", dispute_id);
            }
            for entry in &entries {
                print_json(&serde_json::to_value(entry)?, args.pretty)?;
            }
            match engine.audit(dispute_id) {
                Ok(summary) => print_json(&serde_json::to_value(summary)?, args.pretty)?,
                Err(e) => {
                    print_json(&serde_json::to_value(e.to_structured())?, args.pretty)?;
                    bail!("ledger audit failed for {}", dispute_id);
                }
            }
        }
        Command::Schema => {
            print_json(&serde_json::to_value(schemas())?, true)?;
        }
    }

    Ok(())
}

/// Defaults, then the TOML file, then environment, then flags
fn load_config(args: &Args) -> Result<EngineConfig> {
    let base = match &args.config {
        Some(path) => EngineConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let mut config = base.with_env_overrides();

    if let Some(dir) = &args.ledger_dir {
        config.ledger_dir = Some(dir.clone());
    }
    if let Some(threshold) = args.lock_threshold {
        config.lock_threshold = threshold;
    }
    config.validate()?;
    Ok(config)
}

fn build_engine(args: &Args) -> Result<DisputeEngine> {
    let config = load_config(args)?;
    tracing::info!(
        ledger_dir = ?config.ledger_dir,
        lock_threshold = config.lock_threshold,
        "Starting dispute engine"
    );
    Ok(DisputeEngine::from_config(config)?)
}

fn schemas() -> BTreeMap<&'static str, schemars::schema::RootSchema> {
    let mut schemas = BTreeMap::new();
    schemas.insert("Violation", schemars::schema_for!(Violation));
    schemas.insert("LoggedResponse", schemars::schema_for!(LoggedResponse));
    schemas.insert("ExaminerCheckResult", schemars::schema_for!(ExaminerCheckResult));
    schemas.insert(
        "ResponseLayerViolation",
        schemars::schema_for!(ResponseLayerViolation),
    );
    schemas.insert("EvaluationOutcome", schemars::schema_for!(EvaluationOutcome));
    schemas.insert("LedgerEntry", schemars::schema_for!(LedgerEntry));
    schemas.insert("ReplaySummary", schemars::schema_for!(ReplaySummary));
    schemas.insert("RemedyPlan", schemars::schema_for!(RemedyPlan));
    schemas
}

fn print_json(value: &Value, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", rendered);
    Ok(())
}
