//! LiquiVault CLI — scenario runs, soak sweeps, and scenario generation.
//!
//! Commands:
//! - `run` — execute a TOML scenario and export events and the report
//! - `soak` — generate and run scenarios across a seed range in parallel
//! - `generate` — emit a generated scenario as TOML for inspection
//! - `inspect` — print the headline numbers of a saved vault snapshot

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use liquivault_core::auth::Mode;
use liquivault_runner::{
    export, generate, load_snapshot, run_sweep, GeneratorConfig, Harness, Scenario,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "liquivault",
    about = "LiquiVault CLI — cross-chain stablecoin vault scenario runner"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a TOML scenario file and export its artifacts.
    Run {
        /// Path to the scenario TOML.
        scenario: PathBuf,

        /// Output directory for events.jsonl and report.json.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Generate and run random scenarios across a seed range.
    Soak {
        /// First seed of the range.
        #[arg(long, default_value_t = 0)]
        first_seed: u64,

        /// Number of seeds to run.
        #[arg(long, default_value_t = 100)]
        seeds: u64,

        /// Steps per generated scenario.
        #[arg(long, default_value_t = 50)]
        steps: usize,

        /// Largest single amount the generator uses.
        #[arg(long, default_value_t = 1_000_000)]
        max_amount: u64,

        /// Where to write the per-seed CSV summary.
        #[arg(long, default_value = "results/sweep.csv")]
        output: PathBuf,
    },
    /// Emit a generated scenario as TOML.
    Generate {
        /// Generator seed.
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Steps to generate.
        #[arg(long, default_value_t = 50)]
        steps: usize,

        /// Output path; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the headline numbers of a saved vault snapshot.
    Inspect {
        /// Path to the snapshot JSON.
        snapshot: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            scenario,
            output_dir,
        } => run_scenario(&scenario, &output_dir),
        Commands::Soak {
            first_seed,
            seeds,
            steps,
            max_amount,
            output,
        } => run_soak(first_seed, seeds, steps, max_amount, &output),
        Commands::Generate { seed, steps, out } => run_generate(seed, steps, out.as_deref()),
        Commands::Inspect { snapshot } => run_inspect(&snapshot),
    }
}

fn run_scenario(path: &std::path::Path, output_dir: &std::path::Path) -> Result<()> {
    let scenario = Scenario::load(path)
        .with_context(|| format!("failed to load scenario {}", path.display()))?;
    let report = Harness::run(&scenario).context("scenario setup failed")?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    export::write_events_jsonl(&output_dir.join("events.jsonl"), &report.events)?;
    export::write_report_json(&output_dir.join("report.json"), &report)?;

    println!(
        "scenario '{}': {} steps, {} events, {} mismatches, {} violations",
        report.name,
        report.steps_executed,
        report.events.len(),
        report.mismatches.len(),
        report.violations.len()
    );
    if !report.passed() {
        for m in &report.mismatches {
            eprintln!("step {}: expected {:?}, got {}", m.index, m.expected, m.got);
        }
        for v in &report.violations {
            eprintln!("violation: {v}");
        }
        std::process::exit(1);
    }
    Ok(())
}

fn run_soak(
    first_seed: u64,
    seeds: u64,
    steps: usize,
    max_amount: u64,
    output: &std::path::Path,
) -> Result<()> {
    if seeds == 0 {
        bail!("--seeds must be at least 1");
    }
    let base = GeneratorConfig {
        steps,
        max_amount,
        ..Default::default()
    };
    let summaries = run_sweep(&base, first_seed, seeds);

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    export::write_sweep_csv(output, &summaries)?;

    let failed: Vec<_> = summaries.iter().filter(|s| !s.passed).collect();
    println!(
        "soak: {} seeds, {} failed; summary at {}",
        summaries.len(),
        failed.len(),
        output.display()
    );
    if !failed.is_empty() {
        for s in &failed {
            eprintln!(
                "seed {}: {} mismatches, {} violations",
                s.seed, s.mismatches, s.violations
            );
        }
        std::process::exit(1);
    }
    Ok(())
}

fn run_generate(seed: u64, steps: usize, out: Option<&std::path::Path>) -> Result<()> {
    let scenario = generate(&GeneratorConfig {
        seed,
        steps,
        ..Default::default()
    });
    let toml = toml::to_string_pretty(&scenario).context("failed to serialize scenario")?;
    match out {
        Some(path) => std::fs::write(path, toml)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{toml}"),
    }
    Ok(())
}

fn run_inspect(path: &std::path::Path) -> Result<()> {
    let vault = load_snapshot(path)?;
    let mode = match vault.mode() {
        Mode::Active => "active",
        Mode::Paused => "paused",
    };
    println!("mode:            {mode}");
    println!("staked assets:   {}", vault.total_staked_assets());
    println!("pool value:      {}", vault.total_supply());
    println!("orders:          {}", vault.order_book().len());
    let reference = vault.config().reference_token.clone();
    let ledger = vault.ledger(&reference)?;
    println!(
        "{reference}: balance {} accrued {} reserved {} bridged {}",
        ledger.balance, ledger.fees_accrued, ledger.fees_reserved, ledger.bridge_outstanding
    );
    Ok(())
}
