//! sol_tracker - swap-history PnL analyzer for a single Solana wallet

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config_manager::SystemConfig;
use job_orchestrator::{write_report_csv, ReportOrchestrator, RunProgress, WalletReport};
use std::fs::File;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "sol_tracker",
    version = env!("CARGO_PKG_VERSION"),
    about = "Analyze the swap history of a Solana wallet"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging (also enabled by `system.debug_mode`)
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch, classify and analyze a wallet's swaps
    Analyze(AnalyzeCmd),
}

#[derive(Parser, Debug)]
struct AnalyzeCmd {
    /// Wallet address to analyze
    wallet: String,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    /// Also write the per-token reports as CSV
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Override the number of swap records fetched
    #[arg(long, value_name = "N")]
    limit: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets such as TRACKER__HELIUS__API_KEY usually live in .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Analyze(cmd) => analyze_command(cmd, cli.debug).await,
    }
}

/// Log filter used when `RUST_LOG` is unset
fn default_log_filter(debug: bool, config: &SystemConfig) -> &'static str {
    if debug || config.system.debug_mode {
        "debug"
    } else {
        "info,sol_tracker=debug"
    }
}

fn init_logging(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn analyze_command(cmd: AnalyzeCmd, debug: bool) -> Result<()> {
    let mut config =
        SystemConfig::load_from_path(&cmd.config).context("Failed to load configuration")?;
    init_logging(default_log_filter(debug, &config));

    if let Some(limit) = cmd.limit {
        config.helius.transaction_limit = limit;
    }

    let orchestrator =
        ReportOrchestrator::from_config(&config).context("Failed to initialize clients")?;

    let (tx, mut rx) = mpsc::unbounded_channel::<RunProgress>();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            eprintln!("{}", event);
        }
    });

    let result = orchestrator.run_with_progress(&cmd.wallet, Some(tx)).await;
    // the sender is dropped with the run, which ends the printer
    printer.await.ok();

    let report = result.with_context(|| format!("Analysis of {} failed", cmd.wallet))?;

    if let Some(path) = &cmd.csv {
        export_csv(&report, path)?;
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn export_csv(report: &WalletReport, path: &PathBuf) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_report_csv(report, file)?;

    info!(
        "Wrote {} token rows to {}",
        report.tokens.len(),
        path.display()
    );
    Ok(())
}
