// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};
use wirepack::harness::{self, Scenario, ScenarioParams};
use wirepack::hash::to_hex;
use wirepack::proof::{seal, RunReceipt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Deterministic WirePack scenario runner and journal checker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one scenario (or all) and print sealed run receipts as JSON.
    Run(RunArgs),
    /// Load a receipt journal and verify it as one chain.
    Journal {
        /// Path to the journal file
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// fenwick, merkle, correlation, merge, receipts, join or replay. Runs all when omitted.
    scenario: Option<Scenario>,

    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    n: Option<usize>,
    #[arg(long)]
    k_updates: Option<usize>,
    #[arg(long)]
    m_edits: Option<usize>,
    #[arg(long)]
    checks: Option<usize>,
    #[arg(long)]
    writers: Option<usize>,
    #[arg(long)]
    value_max: Option<u32>,
}

impl RunArgs {
    /// Locked parameters for `scenario` with any command-line overrides.
    fn params_for(&self, scenario: Scenario) -> ScenarioParams {
        let locked = scenario.params();
        ScenarioParams {
            seed: self.seed.unwrap_or(locked.seed),
            n: self.n.unwrap_or(locked.n),
            k_updates: self.k_updates.unwrap_or(locked.k_updates),
            m_edits: self.m_edits.unwrap_or(locked.m_edits),
            checks: self.checks.unwrap_or(locked.checks),
            writers: self.writers.unwrap_or(locked.writers),
            value_max: self.value_max.unwrap_or(locked.value_max),
        }
    }
}

#[derive(Serialize, Debug)]
struct JournalSummary {
    path: String,
    receipts: usize,
    head: String,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "wirepack=info,wirepack_verify=info".into()),
        ))
        .with_writer(std::io::stderr)
        .init();
}

fn run_scenarios(args: &RunArgs) -> Result<()> {
    let scenarios: Vec<Scenario> = match args.scenario {
        Some(s) => vec![s],
        None => Scenario::ALL.to_vec(),
    };

    let mut receipts: Vec<RunReceipt> = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let params = args.params_for(scenario);
        info!(%scenario, seed = params.seed, n = params.n, k = params.k_updates, "running scenario");
        let report = harness::run(scenario, params)
            .with_context(|| format!("Scenario {scenario} could not run"))?;
        let receipt = seal(report).context("Failed to seal run receipt")?;
        info!(%scenario, drift = %receipt.drift_hash, ok = receipt.ok(), "sealed");
        receipts.push(receipt);
    }

    println!("{}", serde_json::to_string_pretty(&receipts)?);

    let failed: Vec<String> = receipts
        .iter()
        .filter(|r| !r.ok())
        .map(|r| r.report.scenario.to_string())
        .collect();
    if !failed.is_empty() {
        error!(?failed, "scenario checks failed");
        anyhow::bail!("Checks failed for: {}", failed.join(", "));
    }
    Ok(())
}

fn check_journal(path: PathBuf) -> Result<()> {
    let chain = wirepack_journal::load_chain(&path)
        .with_context(|| format!("Failed to load receipt journal {}", path.display()))?;
    let summary = JournalSummary {
        path: path.display().to_string(),
        receipts: chain.len(),
        head: to_hex(&chain.head()),
    };
    info!(receipts = summary.receipts, head = %summary.head, "journal verified");
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run_scenarios(&args),
        Command::Journal { path } => check_journal(path),
    }
}
