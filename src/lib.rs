// Quote Sync - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod quote;
pub mod reconciliation;  // Reconciler: local + remote → merged, changed
pub mod deduplication;
pub mod library;
pub mod transfer;
pub mod db;
pub mod remote;
pub mod sync;
pub mod config;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use quote::{seed_quotes, Quote, QuoteRecord};
pub use reconciliation::{reconcile, ReconciliationReport};
pub use deduplication::{DeduplicationEngine, DuplicateMatch, MatchStrategy};
pub use library::{ImportMode, ImportSummary, LibraryError, QuoteLibrary};
pub use transfer::{
    export, export_csv, export_json, parse_import, read_import_file, write_export_file,
    ExportFormat,
};
pub use db::{MemoryStore, QuoteStore, SqliteStore, SyncLogEntry};
pub use remote::{records_from_json, HttpRemoteSource, RemoteError, RemoteSource};
pub use sync::{QuoteService, ServiceError, SyncOutcome};
pub use config::{AppConfig, ConfigManager, RemoteConfig, ServerConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the tracing subscriber used by both binaries.
/// `RUST_LOG` wins over `default_level`.
pub fn init_logging(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Ignore the error when a subscriber is already installed (tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
