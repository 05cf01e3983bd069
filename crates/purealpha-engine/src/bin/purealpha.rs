//! purealpha CLI: run the analysis pipeline against a snapshot file.
//!
//! ## Usage
//!
//! ```bash
//! # Full analysis from a config directory and a snapshot JSON
//! purealpha analyze --config-dir config \
//!                   --snapshot config/snapshot_goldilocks.json \
//!                   --capital 5000 --risk medium --years 1 \
//!                   --journal sessions/provenance.jsonl
//!
//! # List the regime rule table
//! purealpha regimes
//!
//! # Verify a provenance journal's hash chain
//! purealpha verify --journal sessions/provenance.jsonl
//! ```
//!
//! ## Exit Codes
//! - 0: success (analysis produced, chain verified)
//! - 1: structured analysis failure / broken chain
//! - 2: error (missing files, invalid arguments, bad configuration)

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use purealpha_engine::{
    AnalysisEngine, AnalysisQuery, ConfigStore, StaticSnapshotProvider,
};
use purealpha_ledger::ProvenanceLedger;
use purealpha_models::{FeatureSnapshot, RiskLevel};
use purealpha_regime::regime_rules;

/// purealpha: causal-regime portfolio engine.
#[derive(Parser)]
#[command(name = "purealpha")]
#[command(version = "0.1.0")]
#[command(about = "Causal-regime portfolio engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: text (default) or json
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum RiskArg {
    Low,
    Medium,
    High,
}

impl From<RiskArg> for RiskLevel {
    fn from(arg: RiskArg) -> Self {
        match arg {
            RiskArg::Low => RiskLevel::Low,
            RiskArg::Medium => RiskLevel::Medium,
            RiskArg::High => RiskLevel::High,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run one analysis against a snapshot file
    Analyze {
        /// Directory holding feature_catalog.json, asset_universe.json,
        /// causal_hypotheses.json
        #[arg(long, short = 'c')]
        config_dir: PathBuf,

        /// Feature snapshot JSON file
        #[arg(long, short = 's')]
        snapshot: PathBuf,

        /// Investment capital in USD
        #[arg(long)]
        capital: f64,

        /// Risk tolerance
        #[arg(long, default_value = "medium")]
        risk: RiskArg,

        /// Horizon in years
        #[arg(long, default_value = "1")]
        years: u32,

        /// Optional JSONL provenance journal to append to
        #[arg(long)]
        journal: Option<PathBuf>,
    },

    /// List the regime rule table
    Regimes,

    /// Verify a provenance journal's hash chain
    Verify {
        /// JSONL journal written by `analyze --journal`
        #[arg(long, short = 'j')]
        journal: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            error!(error = %format!("{err:#}"), "command failed");
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Analyze {
            config_dir,
            snapshot,
            capital,
            risk,
            years,
            journal,
        } => cmd_analyze(cli.format, config_dir, snapshot, capital, risk, years, journal),
        Commands::Regimes => cmd_regimes(cli.format),
        Commands::Verify { journal } => cmd_verify(journal),
    }
}

fn cmd_analyze(
    format: OutputFormat,
    config_dir: PathBuf,
    snapshot_path: PathBuf,
    capital: f64,
    risk: RiskArg,
    years: u32,
    journal: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let store = ConfigStore::load(&config_dir)
        .map_err(|e| anyhow::anyhow!(e.to_string()))
        .context("load configuration")?;

    let bytes = std::fs::read(&snapshot_path)
        .with_context(|| format!("read snapshot {}", snapshot_path.display()))?;
    let snapshot: FeatureSnapshot =
        serde_json::from_slice(&bytes).context("parse snapshot JSON")?;

    let mut ledger = ProvenanceLedger::new();
    if let Some(path) = journal {
        ledger = ledger.with_journal(path);
    }

    let engine = AnalysisEngine::new(StaticSnapshotProvider::new(snapshot), store, ledger);
    let query = AnalysisQuery {
        capital,
        horizon_years: years,
        risk_level: risk.into(),
    };

    match engine.run(&query, None) {
        Ok(report) => {
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Text => {
                    println!("{}", report.rationale.summary);
                    println!();
                    for warning in &report.warnings {
                        println!("warning: {warning}");
                    }
                    println!(
                        "provenance: seq={} hash={}",
                        report.receipt.sequence, report.receipt.content_hash
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&failure)?),
                OutputFormat::Text => println!("{failure}"),
            }
            Ok(ExitCode::from(1))
        }
    }
}

fn cmd_regimes(format: OutputFormat) -> anyhow::Result<ExitCode> {
    let rules = regime_rules();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rules)?),
        OutputFormat::Text => {
            for rule in &rules {
                println!("{}: {}", rule.label, rule.description);
                for c in &rule.conditions {
                    println!("  {} in [{}, {}]", c.feature, c.low, c.high);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_verify(journal: PathBuf) -> anyhow::Result<ExitCode> {
    match ProvenanceLedger::verify_journal(&journal) {
        Ok(()) => {
            println!("chain OK: {}", journal.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            println!("chain BROKEN: {err}");
            Ok(ExitCode::from(1))
        }
    }
}
