// Quote Sync - Web Server
// REST API with Axum + periodic server sync in the background

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use quote_sync::{
    api, init_logging, AppConfig, ConfigManager, HttpRemoteSource, QuoteService, RemoteSource,
    SqliteStore,
};

#[derive(Parser)]
#[command(name = "quote-server", version, about = "Quote Sync REST API")]
struct Args {
    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the configured one
    #[arg(long)]
    listen: Option<String>,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let manager = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    info!(path = %manager.config_path().display(), "loading configuration");
    let config: AppConfig = manager.load()?;

    let store = Arc::new(SqliteStore::open(&config.database_path)?);
    info!(path = %config.database_path.display(), "database opened");

    let source: Option<Arc<dyn RemoteSource>> = if config.remote.enabled {
        let http = HttpRemoteSource::new(&config.remote)?;
        info!(url = http.url(), "remote sync enabled");
        Some(Arc::new(http))
    } else {
        warn!("remote sync disabled");
        None
    };

    let service = QuoteService::open(store, source, config.seed_defaults)?;

    // Background sync until shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sync_task = if service.has_remote() {
        let service = service.clone();
        let every = Duration::from_secs(config.remote.poll_interval_seconds.max(1));
        Some(tokio::spawn(async move {
            service.run_periodic(every, shutdown_rx).await
        }))
    } else {
        None
    };

    let app = api::router(service);

    let addr = args.listen.unwrap_or(config.server.listen_addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/quotes", addr);
    println!("   Press Ctrl+C to stop");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Server error")?;

    let _ = shutdown_tx.send(true);
    if let Some(task) = sync_task {
        let _ = task.await;
    }

    info!("server stopped");
    Ok(())
}
