use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

use quote_sync::{
    init_logging, read_import_file, write_export_file, AppConfig, ConfigManager,
    DeduplicationEngine, ExportFormat, HttpRemoteSource, ImportMode, MemoryStore, QuoteService,
    QuoteStore, RemoteSource, SqliteStore,
};

#[derive(Parser)]
#[command(name = "quote-sync", version, about = "Quote library with server sync")]
struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/quote-sync/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overrides the configured one
    #[arg(long, global = true, env = "QUOTE_SYNC_DATABASE")]
    database: Option<PathBuf>,

    /// Keep quotes in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Never contact the remote server
    #[arg(long, global = true)]
    offline: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show a random quote
    Random,
    /// Show the quote at INDEX
    Show { index: usize },
    /// Show the last viewed quote
    Last,
    /// List quotes
    List {
        #[arg(long)]
        category: Option<String>,
    },
    /// List categories
    Categories,
    /// Add a quote
    Add {
        text: String,
        #[arg(long, default_value = "")]
        category: String,
    },
    /// Delete the quote at INDEX
    Delete { index: usize },
    /// Remove all quotes
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Import quotes from a JSON file
    Import {
        file: PathBuf,
        /// Replace existing quotes instead of appending
        #[arg(long)]
        replace: bool,
    },
    /// Export quotes to a file
    Export {
        file: PathBuf,
        #[arg(long, default_value = "json")]
        format: ExportFormat,
    },
    /// Merge quotes from the server
    Sync {
        /// Keep polling at the configured interval
        #[arg(long)]
        watch: bool,
    },
    /// Report duplicate quotes
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.verbose { "debug" } else { "warn" });

    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    debug!(path = %manager.config_path().display(), "loading configuration");
    let config = manager.load()?;

    let service = open_service(&cli, &config)?;
    run_command(cli.command, &service, &config).await
}

fn open_service(cli: &Cli, config: &AppConfig) -> Result<QuoteService> {
    let store: Arc<dyn QuoteStore> = if cli.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        let path = cli.database.clone().unwrap_or_else(|| config.database_path.clone());
        Arc::new(SqliteStore::open(&path)?)
    };

    let source: Option<Arc<dyn RemoteSource>> = if config.remote.enabled && !cli.offline {
        let http = HttpRemoteSource::new(&config.remote).context("Failed to create HTTP client")?;
        debug!(url = http.url(), "remote source configured");
        Some(Arc::new(http))
    } else {
        None
    };

    QuoteService::open(store, source, config.seed_defaults)
}

async fn run_command(command: Command, service: &QuoteService, config: &AppConfig) -> Result<()> {
    match command {
        Command::Random => match service.random().await? {
            Some((index, quote)) => print_quote(index, &quote.text, &quote.category),
            None => println!("No quotes available."),
        },

        Command::Show { index } => {
            let quote = service.show(index).await?;
            print_quote(index, &quote.text, &quote.category);
        }

        Command::Last => match service.last_viewed().await {
            Some((index, quote)) => print_quote(index, &quote.text, &quote.category),
            None => match service.random().await? {
                Some((index, quote)) => print_quote(index, &quote.text, &quote.category),
                None => println!("No quotes available."),
            },
        },

        Command::List { category } => {
            let quotes = service.filter_by_category(category.as_deref()).await;
            if quotes.is_empty() {
                println!("No saved quotes.");
            }
            for (index, quote) in quotes {
                println!("{:>4}  {}", index, quote.display_line());
            }
        }

        Command::Categories => {
            for category in service.categories().await {
                println!("{}", category);
            }
        }

        Command::Add { text, category } => {
            let quote = service.add(&text, &category).await?;
            println!("✓ Added {}", quote.display_line());
        }

        Command::Delete { index } => {
            let removed = service.remove(index).await?;
            println!("✓ Deleted {}", removed.display_line());
        }

        Command::Clear { yes } => {
            if !yes {
                eprintln!("❌ This will remove all saved quotes.");
                eprintln!("   Re-run with --yes to continue.");
                std::process::exit(1);
            }
            let removed = service.clear().await?;
            println!("✓ Removed {} quotes", removed);
        }

        Command::Import { file, replace } => {
            let records = read_import_file(&file)?;
            let mode = if replace { ImportMode::Replace } else { ImportMode::Append };
            let summary = service.import(&records, mode).await?;
            println!("✓ Imported {} quotes ({} total)", summary.imported, summary.total);
            if summary.skipped_duplicates > 0 {
                println!("  Skipped duplicates: {}", summary.skipped_duplicates);
            }
            if summary.skipped_malformed > 0 {
                println!("  Skipped records without text: {}", summary.skipped_malformed);
            }
        }

        Command::Export { file, format } => {
            let quotes = service.quotes().await;
            write_export_file(&file, &quotes, format)?;
            println!("✓ Exported {} quotes to {}", quotes.len(), file.display());
        }

        Command::Sync { watch: follow } => {
            if !service.has_remote() {
                eprintln!("❌ Remote sync is disabled (offline or remote.enabled = false)");
                std::process::exit(1);
            }

            if follow {
                let every = Duration::from_secs(config.remote.poll_interval_seconds.max(1));
                let (tx, rx) = watch::channel(false);
                tokio::spawn(async move {
                    let _ = tokio::signal::ctrl_c().await;
                    let _ = tx.send(true);
                });
                println!("🔄 Syncing every {}s (Ctrl+C to stop)", every.as_secs());
                service.run_periodic(every, rx).await;
            } else {
                let outcome = service.sync_once().await;
                match outcome.notification() {
                    Some(message) => println!("{}", message),
                    None => println!("✓ Already up to date"),
                }
                if outcome.error.is_some() {
                    std::process::exit(1);
                }
            }
        }

        Command::Check => {
            let quotes = service.quotes().await;
            let matches = DeduplicationEngine::new().find_duplicates(&quotes);
            if matches.is_empty() {
                println!("✓ {} quotes, no duplicates", quotes.len());
            }
            for m in &matches {
                let marker = if m.strategy.violates_identity() { "❌" } else { "⚠️ " };
                println!("{} [{} ↔ {}] {}", marker, m.first_index, m.second_index, m.reason);
            }
            if !DeduplicationEngine::is_unique(&quotes) {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn print_quote(index: usize, text: &str, category: &str) {
    println!("\"{}\"", text);
    if !category.is_empty() {
        println!("Category: {}", category);
    }
    println!("(#{})", index);
}
