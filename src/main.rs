use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use scour::aggregator::Aggregator;
use scour::api::{AppState, create_router};
use scour::config::CONFIG;
use scour::fetcher::PageFetcher;
use scour::settings::{Settings, for_each_event};
use scour::watcher::spawn_watcher;

#[derive(Parser, Debug)]
#[command(version, about = "Search aggregation service")]
struct Cli {
    /// Address to listen on (overrides SCOUR_BIND_ADDR)
    #[arg(long)]
    bind: Option<String>,

    /// Directory holding the store files (overrides SCOUR_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Refuse to start when a store file is missing
    #[arg(long)]
    require_stores: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let bind = cli.bind.unwrap_or_else(|| CONFIG.bind_addr.clone());
    let data_dir = cli.data_dir.unwrap_or_else(|| CONFIG.data_dir.clone());

    let settings = Arc::new(Settings::open(&data_dir).context("failed to load stores")?);
    if cli.require_stores {
        settings.require_all()?;
    }

    let shutdown = CancellationToken::new();
    let watcher = spawn_watcher(settings.clone(), shutdown.clone())
        .context("failed to watch data directory")?;

    // stand-in for the worker reload hook: other processes are not our concern
    tokio::spawn(for_each_event(settings.subscribe(), |event| {
        tracing::info!(store = %event.kind(), ?event, "config changed");
    }));

    let fetcher = PageFetcher::from_config(&CONFIG)?;
    let state = Arc::new(AppState {
        aggregator: Aggregator::new(fetcher, CONFIG.page_size)
            .with_max_concurrency(CONFIG.max_pages as usize),
        settings,
        max_pages: CONFIG.max_pages,
    });

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(addr = %bind, "listening");

    let token = shutdown.clone();
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            token.cancel();
        })
        .await?;

    shutdown.cancel();
    let _ = watcher.await;
    Ok(())
}
