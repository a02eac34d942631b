// 🔄 Quote Service - owns the library, persists every change, syncs with the server
//
// The remote fetch runs outside the library lock; reconcile + persist run
// under it, so two syncs (or a sync and a user edit) never interleave a write.

use crate::db::{QuoteStore, SyncLogEntry};
use crate::library::{ImportMode, ImportSummary, LibraryError, QuoteLibrary};
use crate::quote::{Quote, QuoteRecord};
use crate::reconciliation::ReconciliationReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::remote::RemoteSource;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

// ============================================================================
// SYNC OUTCOME
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub synced_at: DateTime<Utc>,

    /// Present when the fetch succeeded
    pub report: Option<ReconciliationReport>,

    /// Fetch or persistence failure, if any
    pub error: Option<String>,
}

impl SyncOutcome {
    pub fn changed(&self) -> bool {
        self.error.is_none() && self.report.as_ref().map(|r| r.changed).unwrap_or(false)
    }

    pub fn admitted(&self) -> usize {
        if self.changed() {
            self.report.as_ref().map(|r| r.admitted).unwrap_or(0)
        } else {
            0
        }
    }

    /// Message for the user, if there is anything to tell
    pub fn notification(&self) -> Option<String> {
        if let Some(error) = &self.error {
            return Some(format!("Sync failed: {}", error));
        }
        match self.admitted() {
            0 => None,
            1 => Some("1 new quote synced from server".to_string()),
            n => Some(format!("{} new quotes synced from server", n)),
        }
    }
}

// ============================================================================
// QUOTE SERVICE
// ============================================================================

#[derive(Clone)]
pub struct QuoteService {
    library: Arc<Mutex<QuoteLibrary>>,
    store: Arc<dyn QuoteStore>,
    source: Option<Arc<dyn RemoteSource>>,
}

impl QuoteService {
    /// Load the library from `store`, seeding defaults on first run
    pub fn open(
        store: Arc<dyn QuoteStore>,
        source: Option<Arc<dyn RemoteSource>>,
        seed_defaults: bool,
    ) -> anyhow::Result<Self> {
        let mut library = match store.load()? {
            Some(records) => QuoteLibrary::from_records(&records),
            None if seed_defaults => {
                let seeded = QuoteLibrary::with_seed();
                store.save(seeded.quotes())?;
                info!(count = seeded.len(), "seeded default quotes");
                seeded
            }
            None => QuoteLibrary::new(),
        };
        library.restore_last_viewed(store.load_last_viewed()?);

        debug!(count = library.len(), "quote library loaded");

        Ok(QuoteService {
            library: Arc::new(Mutex::new(library)),
            store,
            source,
        })
    }

    pub fn has_remote(&self) -> bool {
        self.source.is_some()
    }

    /// Apply `f` to a copy of the library, persist it in one write, then commit.
    /// A failed save leaves both the store and the in-memory library untouched.
    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut QuoteLibrary) -> Result<T, LibraryError>,
    ) -> Result<T, ServiceError> {
        let mut library = self.library.lock().await;
        let mut next = library.clone();
        let value = f(&mut next)?;
        self.store.save_state(next.quotes(), next.last_viewed())?;
        *library = next;
        Ok(value)
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub async fn quotes(&self) -> Vec<Quote> {
        self.library.lock().await.quotes().to_vec()
    }

    pub async fn len(&self) -> usize {
        self.library.lock().await.len()
    }

    pub async fn categories(&self) -> Vec<String> {
        self.library.lock().await.categories()
    }

    pub async fn filter_by_category(&self, category: Option<&str>) -> Vec<(usize, Quote)> {
        self.library
            .lock()
            .await
            .filter_by_category(category)
            .into_iter()
            .map(|(i, q)| (i, q.clone()))
            .collect()
    }

    pub async fn last_viewed(&self) -> Option<(usize, Quote)> {
        self.library
            .lock()
            .await
            .last_viewed_quote()
            .map(|(i, q)| (i, q.clone()))
    }

    pub fn recent_syncs(&self, limit: usize) -> anyhow::Result<Vec<SyncLogEntry>> {
        self.store.recent_syncs(limit)
    }

    // ------------------------------------------------------------------------
    // Viewing (remembers the last viewed quote)
    // ------------------------------------------------------------------------

    pub async fn random(&self) -> Result<Option<(usize, Quote)>, ServiceError> {
        let mut library = self.library.lock().await;
        let previous = library.last_viewed();
        let picked = {
            let mut rng = rand::thread_rng();
            library.random(&mut rng).map(|(i, q)| (i, q.clone()))
        };
        if picked.is_some() {
            self.remember_viewed(&mut library, previous)?;
        }
        Ok(picked)
    }

    pub async fn show(&self, index: usize) -> Result<Quote, ServiceError> {
        let mut library = self.library.lock().await;
        let previous = library.last_viewed();
        let quote = library.show(index)?.clone();
        self.remember_viewed(&mut library, previous)?;
        Ok(quote)
    }

    /// Persist the new last-viewed index, rolling back to `previous` on failure
    fn remember_viewed(
        &self,
        library: &mut QuoteLibrary,
        previous: Option<usize>,
    ) -> Result<(), ServiceError> {
        if let Err(e) = self.store.save_last_viewed(library.last_viewed()) {
            library.restore_last_viewed(previous);
            return Err(e.into());
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Add a quote locally, then offer it to the server (best effort)
    pub async fn add(&self, text: &str, category: &str) -> Result<Quote, ServiceError> {
        let quote = self.mutate(|lib| lib.add(text, category).cloned()).await?;
        info!(text = %quote.text, category = %quote.category, "quote added");

        if let Some(source) = &self.source {
            if let Err(e) = source.publish_quote(&quote).await {
                warn!(error = %e, "failed to publish quote to server");
            }
        }

        Ok(quote)
    }

    pub async fn remove(&self, index: usize) -> Result<Quote, ServiceError> {
        let removed = self.mutate(|lib| lib.remove(index)).await?;
        info!(index, text = %removed.text, "quote deleted");
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<usize, ServiceError> {
        let removed = self
            .mutate(|lib| {
                let count = lib.len();
                lib.clear();
                Ok(count)
            })
            .await?;
        info!(removed, "all quotes cleared");
        Ok(removed)
    }

    pub async fn import(
        &self,
        records: &[QuoteRecord],
        mode: ImportMode,
    ) -> Result<ImportSummary, ServiceError> {
        let summary = self.mutate(|lib| Ok(lib.import(records, mode))).await?;
        info!(
            imported = summary.imported,
            duplicates = summary.skipped_duplicates,
            malformed = summary.skipped_malformed,
            "quotes imported"
        );
        Ok(summary)
    }

    // ------------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------------

    /// One fetch → reconcile → persist cycle. Never fails; problems are
    /// reported in the outcome and nothing is persisted.
    pub async fn sync_once(&self) -> SyncOutcome {
        let outcome = match &self.source {
            None => SyncOutcome {
                synced_at: Utc::now(),
                report: None,
                error: Some(crate::remote::RemoteError::Disabled.to_string()),
            },
            Some(source) => {
                // Fetch outside the lock: local edits may land meanwhile
                match source.fetch_quotes().await {
                    Ok(records) => self.apply_remote(&records).await,
                    Err(e) => {
                        warn!(error = %e, "remote fetch failed");
                        SyncOutcome {
                            synced_at: Utc::now(),
                            report: None,
                            error: Some(e.to_string()),
                        }
                    }
                }
            }
        };

        let entry = SyncLogEntry {
            synced_at: outcome.synced_at,
            admitted: outcome.admitted(),
            total: self.len().await,
            error: outcome.error.clone(),
        };
        if let Err(e) = self.store.record_sync(&entry) {
            warn!(error = %e, "failed to record sync");
        }

        outcome
    }

    /// Reconcile fetched records against the current library and persist if changed
    pub async fn apply_remote(&self, records: &[QuoteRecord]) -> SyncOutcome {
        let mut library = self.library.lock().await;
        let mut next = library.clone();
        let report = next.merge_remote(records);

        let mut error = None;
        if report.changed {
            match self.store.save(next.quotes()) {
                Ok(()) => {
                    *library = next;
                    info!("{}", report.summary());
                }
                Err(e) => {
                    warn!(error = %e, "failed to persist synced quotes");
                    error = Some(format!("{:#}", e));
                }
            }
        } else {
            debug!("{}", report.summary());
        }

        SyncOutcome {
            synced_at: Utc::now(),
            report: Some(report),
            error,
        }
    }

    /// Poll the server every `every` until `shutdown` becomes true
    pub async fn run_periodic(&self, every: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = every.as_secs(), "periodic sync started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = self.sync_once().await;
                    if let Some(message) = outcome.notification() {
                        info!("{}", message);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("periodic sync stopped");
    }
}

// ============================================================================
// TESTS
// ============================================================================
