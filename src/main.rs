mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use vm_core::config::Config;
use vm_core::{Catalog, ItemId};
use vm_db::catalog::CatalogSnapshot;
use vm_db::SqliteCatalog;
use vm_engine::ProgressSink;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise pick defaults by verbosity.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "versionmerge=trace,vm_server=trace,vm_engine=trace,vm_db=debug,tower_http=debug".to_string()
        } else {
            "versionmerge=debug,vm_server=info,vm_engine=debug,vm_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Validate { config } = &cli.command {
        let path = config.clone().or(cli.config.clone());
        return validate_config(path.as_deref());
    }

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.server.db_path = db;
    }

    let command = cli.command;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        match command {
            Commands::Start { host, port } => {
                if let Some(host) = host {
                    config.server.host = host;
                }
                if let Some(port) = port {
                    config.server.port = port;
                }
                tracing::info!("Starting versionmerge server");
                vm_server::start(config).await?;
                Ok(())
            }
            Commands::MergeMovies => {
                let (catalog, cancel) = open_catalog(&config)?;
                let report =
                    vm_engine::merge_movies(&catalog, &config.merge, Some(log_progress()), cancel)
                        .await?;
                print_json(&report)
            }
            Commands::SplitMovies => {
                let (catalog, cancel) = open_catalog(&config)?;
                let report =
                    vm_engine::split_movies(&catalog, &config.merge, Some(log_progress()), cancel)
                        .await?;
                print_json(&report)
            }
            Commands::MergeEpisodes => {
                let (catalog, cancel) = open_catalog(&config)?;
                let report = vm_engine::merge_episodes(
                    &catalog,
                    &config.merge,
                    Some(log_progress()),
                    cancel,
                )
                .await?;
                print_json(&report)
            }
            Commands::SplitEpisodes => {
                let (catalog, cancel) = open_catalog(&config)?;
                let report = vm_engine::split_episodes(
                    &catalog,
                    &config.merge,
                    Some(log_progress()),
                    cancel,
                )
                .await?;
                print_json(&report)
            }
            Commands::SplitItem { id } => {
                let item_id: ItemId = id
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid item ID: {id}"))?;
                let (catalog, _) = open_catalog(&config)?;
                if catalog.get_item(item_id).await?.is_none() {
                    anyhow::bail!("Item not found: {item_id}");
                }
                let outcome = vm_engine::split_item(catalog.as_ref(), item_id, &config.merge).await?;
                print_json(&outcome)
            }
            Commands::Import { file } => import_snapshot(&config, &file).await,
            Commands::Validate { .. } => Ok(()),
        }
    })
}

/// Load the config file strictly when one is given, so typos are reported
/// instead of silently replaced by defaults.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) if p.exists() => {
            let contents = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read config file {}", p.display()))?;
            let config = Config::from_json(&contents)?;
            for warning in config.validate() {
                tracing::warn!("Config warning: {warning}");
            }
            Ok(config)
        }
        other => Ok(Config::load_or_default(other)),
    }
}

/// Open the SQLite catalog and arm Ctrl+C to stop the run between groups.
fn open_catalog(config: &Config) -> Result<(Arc<dyn Catalog>, CancellationToken)> {
    let pool = vm_db::pool::init_pool(&config.server.db_path)
        .with_context(|| format!("Failed to open {}", config.server.db_path.display()))?;
    let catalog: Arc<dyn Catalog> = Arc::new(SqliteCatalog::new(pool));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; finishing groups already started");
            on_signal.cancel();
        }
    });

    Ok((catalog, cancel))
}

fn log_progress() -> ProgressSink {
    ProgressSink::new(|percent| tracing::info!(percent, "Progress"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn import_snapshot(config: &Config, file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read snapshot {}", file.display()))?;
    let snapshot: CatalogSnapshot = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid snapshot {}", file.display()))?;

    let pool = vm_db::pool::init_pool(&config.server.db_path)?;
    let summary = SqliteCatalog::new(pool).import(snapshot).await?;
    tracing::info!(
        libraries = summary.libraries,
        items = summary.items,
        "Imported catalog snapshot"
    );
    print_json(&summary)
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let contents = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read config file {}", p.display()))?;
            let config = Config::from_json(&contents)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Database: {}", config.server.db_path.display());
            println!("  Auth enabled: {}", config.auth.enabled);
            println!("  Provider: {}", config.merge.provider);
            println!("  Excluded locations: {}", config.merge.locations_excluded.len());
            println!("  Schedule enabled: {}", config.schedule.enabled);
            for warning in config.validate() {
                println!("  ! {warning}");
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Database: {}", config.server.db_path.display());
        }
    }

    Ok(())
}
