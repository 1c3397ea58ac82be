//! harken-analyze - offline analyzer for listening-test result bundles
//!
//! Loads every persisted bundle, drops sessions that failed their attention
//! checks, aggregates swap-corrected scores per system and per utterance,
//! prints a summary table, and writes CSV + JSON exports.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use harken_analyze::aggregate::aggregate;
use harken_analyze::attention::passes_attention_checks;
use harken_analyze::bundle::load_bundles;
use harken_analyze::export::{write_system_csv, write_utterance_json};

#[derive(Parser, Debug)]
#[command(name = "harken-analyze", about = "Aggregate listening-test results")]
struct Args {
    /// Directory containing the *_results.json bundles
    results_dir: PathBuf,

    /// CSV output path (default: <results_dir>/mos_results.csv)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Per-utterance JSON output path (default: <results_dir>/per_utterance.json)
    #[arg(long)]
    utterance_json: Option<PathBuf>,

    /// Include bundles that failed their attention checks
    #[arg(long)]
    keep_failed: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let bundles = load_bundles(&args.results_dir)?;
    let total = bundles.len();
    info!("loaded {total} result bundles from {}", args.results_dir.display());

    let kept: Vec<_> = bundles
        .into_iter()
        .filter(|bundle| {
            if args.keep_failed || passes_attention_checks(&bundle.results) {
                true
            } else {
                warn!("excluded {} (failed attention checks)", bundle.user_id);
                false
            }
        })
        .collect();
    info!(
        "kept {}/{} bundles ({} excluded)",
        kept.len(),
        total,
        total - kept.len()
    );

    let records: Vec<_> = kept.into_iter().flat_map(|b| b.results).collect();
    let aggregates = aggregate(&records);

    println!();
    println!("{:<8} {:<20} {:>8} {:>20} {:>6}", "type", "system", "mean", "95% CI", "n");
    println!("{}", "-".repeat(66));
    for (tag, by_system) in &aggregates.per_system {
        for (system, stats) in by_system {
            println!(
                "{:<8} {:<20} {:>8.3} [{:>7.3}, {:>7.3}] {:>6}",
                tag.to_string(),
                system,
                stats.mean,
                stats.ci_lower,
                stats.ci_upper,
                stats.n_samples
            );
        }
    }
    if !aggregates.editing_per_system.is_empty() {
        println!();
        println!("EMOS editing-effect scores");
        println!("{}", "-".repeat(66));
        for (system, stats) in &aggregates.editing_per_system {
            println!(
                "{:<8} {:<20} {:>8.3} [{:>7.3}, {:>7.3}] {:>6}",
                "EMOS-ed", system, stats.mean, stats.ci_lower, stats.ci_upper, stats.n_samples
            );
        }
    }

    let csv_path = args
        .csv
        .unwrap_or_else(|| args.results_dir.join("mos_results.csv"));
    write_system_csv(&aggregates, &csv_path)?;
    info!("wrote {}", csv_path.display());

    let json_path = args
        .utterance_json
        .unwrap_or_else(|| args.results_dir.join("per_utterance.json"));
    write_utterance_json(&aggregates, &json_path)?;
    info!("wrote {}", json_path.display());

    Ok(())
}
