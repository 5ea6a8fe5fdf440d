//! coverfill - fills in missing artist/album/title tags and embedded cover
//! art for an MP3 collection
//!
//! Runs catalog passes until one completes; faulted passes restart after a
//! cooldown. Exits non-zero only on startup failure or when the restart
//! limit is reached.

use anyhow::{Context, Result};
use clap::Parser;
use coverfill::config::{
    CliOverrides, EnrichConfig, COVER_CACHE_ENV_VAR, ORDER_ENV_VAR, STATE_FILE_ENV_VAR,
};
use coverfill::build_runner;
use coverfill_common::config::{
    load_toml_config, resolve_config_path, TomlConfig, CONFIG_ENV_VAR, ROOT_ENV_VAR,
};
use coverfill_common::events::EventBus;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, warn};

/// Command-line arguments for coverfill
#[derive(Parser, Debug)]
#[command(name = "coverfill")]
#[command(about = "Fill in missing tags and cover art for an MP3 collection")]
#[command(version)]
struct Args {
    /// Music collection root (default ./music)
    #[arg(env = ROOT_ENV_VAR)]
    root: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// metadata-first or image-first
    #[arg(long, env = ORDER_ENV_VAR)]
    order: Option<String>,

    /// Journal of settled files, kept across restarts
    #[arg(long, env = STATE_FILE_ENV_VAR)]
    state_file: Option<PathBuf>,

    /// Cover image cache directory
    #[arg(long, env = COVER_CACHE_ENV_VAR)]
    cover_cache: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let toml_config = match &config_path {
        Some(path) => load_toml_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TomlConfig::default(),
    };

    // Initialize tracing; RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.as_str().into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting coverfill v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &config_path {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        Some(path) => warn!("Config file {} not found, using defaults", path.display()),
        None => info!("No config directory available, using defaults"),
    }

    let cli = CliOverrides {
        root: args.root,
        order: args.order,
        state_file: args.state_file,
        cover_cache: args.cover_cache,
    };
    let config = EnrichConfig::resolve(&cli, &toml_config).context("Invalid configuration")?;

    info!("Root folder: {}", config.root_folder.display());
    info!("Reconcile order: {}", config.order);
    info!("Cover cache: {}", config.cover_cache_dir.display());
    if let Some(state_file) = &config.state_file {
        info!("State file: {}", state_file.display());
    }

    let event_bus = EventBus::default();
    let mut runner =
        build_runner(&config, event_bus).context("Failed to initialize enrichment pipeline")?;
    info!("Run id: {}", runner.run_id());

    tokio::select! {
        result = runner.run_catalog(&config.root_folder) => {
            match result {
                Ok(summary) => {
                    info!(
                        "Done: {} files, {} enriched, {} skipped, {} unresolved",
                        summary.total, summary.enriched, summary.skipped, summary.unresolved
                    );
                }
                Err(e) => {
                    error!("{}", e);
                    return Err(e.into());
                }
            }
        }
        _ = shutdown_signal() => {}
    }

    info!(settled = runner.processed().len(), "Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
