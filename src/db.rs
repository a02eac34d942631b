// 🗄️ Storage - flat load/save of the quote list
// SQLite (WAL) for the real thing, in-memory for tests and --ephemeral

use crate::quote::{Quote, QuoteRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

const SAVED_MARKER_KEY: &str = "quotes_saved";
const LAST_VIEWED_KEY: &str = "last_viewed_index";

// ============================================================================
// SYNC LOG (audit trail of remote syncs)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub synced_at: DateTime<Utc>,
    pub admitted: usize,
    pub total: usize,
    pub error: Option<String>,
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Opaque persistence for the quote list.
///
/// `load` returns `None` when nothing was ever saved, so callers can tell a
/// first run (seed defaults) from a deliberately emptied library.
pub trait QuoteStore: Send + Sync {
    fn load(&self) -> Result<Option<Vec<QuoteRecord>>>;

    fn save(&self, quotes: &[Quote]) -> Result<()>;

    fn load_last_viewed(&self) -> Result<Option<usize>>;

    fn save_last_viewed(&self, index: Option<usize>) -> Result<()>;

    /// Quotes and last-viewed index in one atomic write
    fn save_state(&self, quotes: &[Quote], last_viewed: Option<usize>) -> Result<()>;

    fn record_sync(&self, entry: &SyncLogEntry) -> Result<()>;

    fn recent_syncs(&self, limit: usize) -> Result<Vec<SyncLogEntry>>;
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        setup_database(&conn)?;
        debug!(path = %path.display(), "opened quote database");

        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Database connection lock poisoned"))?;
        f(&mut conn)
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery (in-memory databases report "memory")
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS quotes (
            position INTEGER PRIMARY KEY,
            text TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sync_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            synced_at TEXT NOT NULL,
            admitted INTEGER NOT NULL,
            total INTEGER NOT NULL,
            error TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sync_log_synced_at ON sync_log(synced_at)",
        [],
    )?;

    Ok(())
}

fn get_kv(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}

fn set_kv(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO kv (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

fn write_quotes(conn: &Connection, quotes: &[Quote]) -> Result<()> {
    conn.execute("DELETE FROM quotes", [])?;
    let mut stmt =
        conn.prepare("INSERT INTO quotes (position, text, category) VALUES (?1, ?2, ?3)")?;
    for (position, quote) in quotes.iter().enumerate() {
        stmt.execute(params![position as i64, quote.text, quote.category])?;
    }
    set_kv(conn, SAVED_MARKER_KEY, &Utc::now().to_rfc3339())
}

fn write_last_viewed(conn: &Connection, index: Option<usize>) -> Result<()> {
    match index {
        Some(i) => set_kv(conn, LAST_VIEWED_KEY, &i.to_string())?,
        None => {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![LAST_VIEWED_KEY])?;
        }
    }
    Ok(())
}

impl QuoteStore for SqliteStore {
    fn load(&self) -> Result<Option<Vec<QuoteRecord>>> {
        self.with_conn(|conn| {
            if get_kv(conn, SAVED_MARKER_KEY)?.is_none() {
                return Ok(None);
            }

            let mut stmt =
                conn.prepare("SELECT text, category FROM quotes ORDER BY position")?;
            let records = stmt
                .query_map([], |row| {
                    Ok(QuoteRecord {
                        text: row.get(0)?,
                        category: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read quotes")?;

            Ok(Some(records))
        })
    }

    fn save(&self, quotes: &[Quote]) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            write_quotes(&tx, quotes)?;
            tx.commit().context("Failed to commit quotes")?;

            debug!(count = quotes.len(), "saved quotes");
            Ok(())
        })
    }

    fn load_last_viewed(&self) -> Result<Option<usize>> {
        self.with_conn(|conn| {
            Ok(get_kv(conn, LAST_VIEWED_KEY)?.and_then(|v| v.parse::<usize>().ok()))
        })
    }

    fn save_last_viewed(&self, index: Option<usize>) -> Result<()> {
        self.with_conn(|conn| write_last_viewed(conn, index))
    }

    fn save_state(&self, quotes: &[Quote], last_viewed: Option<usize>) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            write_quotes(&tx, quotes)?;
            write_last_viewed(&tx, last_viewed)?;
            tx.commit().context("Failed to commit library state")?;

            debug!(count = quotes.len(), ?last_viewed, "saved library state");
            Ok(())
        })
    }

    fn record_sync(&self, entry: &SyncLogEntry) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sync_log (synced_at, admitted, total, error) VALUES (?1, ?2, ?3, ?4)",
                params![
                    entry.synced_at.to_rfc3339(),
                    entry.admitted as i64,
                    entry.total as i64,
                    entry.error,
                ],
            )?;
            Ok(())
        })
    }

    fn recent_syncs(&self, limit: usize) -> Result<Vec<SyncLogEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT synced_at, admitted, total, error
                 FROM sync_log
                 ORDER BY id DESC
                 LIMIT ?1",
            )?;

            let entries = stmt
                .query_map(params![limit as i64], |row| {
                    let synced_at: String = row.get(0)?;
                    let admitted: i64 = row.get(1)?;
                    let total: i64 = row.get(2)?;
                    Ok(SyncLogEntry {
                        synced_at: DateTime::parse_from_rfc3339(&synced_at)
                            .map_err(|e| {
                                rusqlite::Error::FromSqlConversionFailure(
                                    0,
                                    rusqlite::types::Type::Text,
                                    Box::new(e),
                                )
                            })?
                            .with_timezone(&Utc),
                        admitted: admitted as usize,
                        total: total as usize,
                        error: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(entries)
        })
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

#[derive(Default)]
struct MemoryState {
    quotes: Option<Vec<Quote>>,
    last_viewed: Option<usize>,
    syncs: Vec<SyncLogEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already holds `quotes` (as if saved earlier)
    pub fn with_quotes(quotes: Vec<Quote>) -> Self {
        MemoryStore {
            state: Mutex::new(MemoryState {
                quotes: Some(quotes),
                ..Default::default()
            }),
        }
    }

    /// Current saved quotes, if any
    pub fn snapshot(&self) -> Option<Vec<Quote>> {
        self.state.lock().ok().and_then(|s| s.quotes.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow::anyhow!("Memory store lock poisoned"))
    }
}

impl QuoteStore for MemoryStore {
    fn load(&self) -> Result<Option<Vec<QuoteRecord>>> {
        Ok(self
            .lock()?
            .quotes
            .as_ref()
            .map(|qs| qs.iter().cloned().map(QuoteRecord::from).collect()))
    }

    fn save(&self, quotes: &[Quote]) -> Result<()> {
        self.lock()?.quotes = Some(quotes.to_vec());
        Ok(())
    }

    fn load_last_viewed(&self) -> Result<Option<usize>> {
        Ok(self.lock()?.last_viewed)
    }

    fn save_last_viewed(&self, index: Option<usize>) -> Result<()> {
        self.lock()?.last_viewed = index;
        Ok(())
    }

    fn save_state(&self, quotes: &[Quote], last_viewed: Option<usize>) -> Result<()> {
        let mut state = self.lock()?;
        state.quotes = Some(quotes.to_vec());
        state.last_viewed = last_viewed;
        Ok(())
    }

    fn record_sync(&self, entry: &SyncLogEntry) -> Result<()> {
        self.lock()?.syncs.push(entry.clone());
        Ok(())
    }

    fn recent_syncs(&self, limit: usize) -> Result<Vec<SyncLogEntry>> {
        Ok(self.lock()?.syncs.iter().rev().take(limit).cloned().collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================
