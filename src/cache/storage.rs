//! Cache storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use std::sync::Mutex;

use super::types::{CachedAsset, StoredAsset};

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Store a batch of responses into a named cache atomically.
  ///
  /// Either every asset in the batch is stored or none of them are.
  /// Existing entries with the same URL are replaced.
  fn store_all(&self, cache_name: &str, assets: &[CachedAsset]) -> Result<()>;

  /// Look up a response by exact URL across all named caches.
  fn match_url(&self, url: &str) -> Result<Option<StoredAsset>>;

  /// All responses stored in a named cache, ordered by URL.
  fn entries(&self, cache_name: &str) -> Result<Vec<StoredAsset>>;
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Create a new SQLite storage at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// Create an in-memory storage. Contents are lost when dropped.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;

    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  /// Get the default database path.
  fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("precache").join("cache.db"))
  }

  /// Run database migrations for the cache table.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for the cache table.
const CACHE_SCHEMA: &str = r#"
-- Stored responses keyed by cache name + request URL
CREATE TABLE IF NOT EXISTS asset_cache (
    cache_name TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (cache_name, url)
);

CREATE INDEX IF NOT EXISTS idx_asset_cache_url ON asset_cache(url);
"#;

impl CacheStorage for SqliteStorage {
  fn store_all(&self, cache_name: &str, assets: &[CachedAsset]) -> Result<()> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    // A dropped transaction rolls back, so a failed batch stores nothing.
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    for asset in assets {
      let headers = serde_json::to_string(&asset.headers)
        .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

      tx
        .execute(
          "INSERT OR REPLACE INTO asset_cache (cache_name, url, status, headers, body, cached_at)
           VALUES (?, ?, ?, ?, ?, datetime('now'))",
          params![cache_name, asset.url, asset.status, headers, asset.body],
        )
        .map_err(|e| eyre!("Failed to store {}: {}", asset.url, e))?;
    }

    tx
      .commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn match_url(&self, url: &str) -> Result<Option<StoredAsset>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT url, status, headers, body, cached_at FROM asset_cache
         WHERE url = ? ORDER BY cache_name LIMIT 1",
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let row = stmt.query_row(params![url], row_to_record).ok();

    row.map(record_to_stored).transpose()
  }

  fn entries(&self, cache_name: &str) -> Result<Vec<StoredAsset>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT url, status, headers, body, cached_at FROM asset_cache
         WHERE cache_name = ? ORDER BY url",
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let rows: Vec<RawRecord> = stmt
      .query_map(params![cache_name], row_to_record)
      .map_err(|e| eyre!("Failed to query entries: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    rows.into_iter().map(record_to_stored).collect()
  }
}

/// Raw row as read from SQLite, before header/timestamp decoding.
type RawRecord = (String, u16, String, Vec<u8>, String);

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
  Ok((
    row.get(0)?,
    row.get(1)?,
    row.get(2)?,
    row.get(3)?,
    row.get(4)?,
  ))
}

fn record_to_stored(record: RawRecord) -> Result<StoredAsset> {
  let (url, status, headers, body, cached_at_str) = record;

  let headers: Vec<(String, String)> =
    serde_json::from_str(&headers).map_err(|e| eyre!("Failed to parse headers: {}", e))?;
  let cached_at = parse_datetime(&cached_at_str)?;

  Ok(StoredAsset {
    asset: CachedAsset {
      url,
      status,
      headers,
      body,
    },
    cached_at,
  })
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
