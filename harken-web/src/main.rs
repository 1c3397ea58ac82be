//! harken-web - Listening-test web service
//!
//! Presents audio rating trials to participants through a web form, records
//! validated responses, and persists one result bundle per completed session.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use harken_common::catalog::Catalog;
use harken_common::config::{resolve_config_path, AppConfig};
use harken_common::locale::Locale;
use harken_web::descriptor::DescriptorRegistry;
use harken_web::{build_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "harken-web", about = "Listening-test web service")]
struct Args {
    /// Config file (falls back to $HARKEN_CONFIG, then ./harken.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured HTTP port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let config = AppConfig::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting Harken listening-test server v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!("Config: {}", config_path.display());

    // Catalog problems are fatal at startup; no session can be sampled
    // without a valid catalog.
    let catalog = match Catalog::load(&config.paths.catalog) {
        Ok(catalog) => {
            info!(
                "✓ Catalog loaded: {} candidate trials in {} groups",
                catalog.total_candidates(),
                catalog.num_groups()
            );
            catalog
        }
        Err(e) => {
            error!("Failed to load catalog: {}", e);
            return Err(e.into());
        }
    };

    let locale = match &config.paths.locale_file {
        Some(path) => Locale::load(path)?,
        None => Locale::builtin(&config.test.language)?,
    };
    info!("✓ Locale: {}", locale.language);

    // A catalog or config entry whose type has no descriptor is a registry
    // mismatch and must fail here, not mid-session.
    let registry = DescriptorRegistry::with_locale(&locale);
    registry.validate_catalog(&catalog)?;
    registry.validate_trials(config.instruction_trials.iter())?;
    registry.validate_trials(config.attention_pool.iter())?;

    let host = config.server.host.clone();
    let port = args.port.unwrap_or(config.server.port);

    let state = AppState::new(config, catalog, registry);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!("harken-web listening on http://{host}:{port}");
    info!("Health check: http://{host}:{port}/health");

    axum::serve(listener, app).await?;

    Ok(())
}
