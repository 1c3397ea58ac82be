//! harken-gen - trial catalog generator
//!
//! Crawls per-system audio files and emits the catalog JSON consumed by the
//! listening-test web service.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use harken_gen::builder::{build_catalog, catalog_json, SystemFiles};
use harken_gen::config::GeneratorConfig;
use harken_gen::{local_fs, web_server};

#[derive(Parser, Debug)]
#[command(name = "harken-gen", about = "Generate listening-test catalogs")]
struct Args {
    /// Test plan TOML
    #[arg(short, long)]
    config: PathBuf,

    /// Output catalog JSON path
    #[arg(short, long, default_value = "catalog.json")]
    output: PathBuf,

    #[command(subcommand)]
    source: Source,
}

#[derive(Subcommand, Debug)]
enum Source {
    /// Scan per-system directories on the local filesystem
    LocalFs {
        /// Audio root the configured system directories live under; catalog
        /// paths are recorded relative to it
        #[arg(long)]
        audio_root: PathBuf,
    },
    /// Fetch per-system Apache-style directory listings over HTTP
    WebServer,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let config = GeneratorConfig::load(&args.config)?;
    info!(
        "test plan: {} systems, {} comparative / {} similarity / {} quality / {} naturalness plans",
        config.systems.len(),
        config.tests.comparative.len(),
        config.tests.similarity.len(),
        config.tests.quality.len(),
        config.tests.naturalness.len()
    );

    let mut system_files = SystemFiles::new();
    match &args.source {
        Source::LocalFs { audio_root } => {
            for (system, location) in &config.systems {
                let dir = audio_root.join(location);
                let files = local_fs::scan_system_dir(&dir, system, audio_root)?;
                system_files.insert(system.clone(), files);
            }
        }
        Source::WebServer => {
            let client = reqwest::Client::builder()
                .user_agent("harken-gen")
                .build()?;
            for (system, url) in &config.systems {
                let files = web_server::scan_system_url(&client, url, system).await?;
                system_files.insert(system.clone(), files);
            }
        }
    }

    let buckets = {
        let mut rng = rand::thread_rng();
        build_catalog(&system_files, &config, &mut rng)?
    };
    let total: usize = buckets.values().flat_map(|g| g.iter().map(Vec::len)).sum();

    std::fs::write(&args.output, catalog_json(&buckets)?)?;
    info!(
        "wrote {} trials in {} groups to {}",
        total,
        buckets.values().map(Vec::len).sum::<usize>(),
        args.output.display()
    );

    Ok(())
}
