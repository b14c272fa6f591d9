//! Durable key/timestamp slots.
//!
//! # Responsibility
//! - Persist absolute timestamps across process restarts.
//! - Back the countdown endpoint read by every remaining-time computation.
//!
//! # Invariants
//! - Values are stored as Unix epoch milliseconds.
//! - `set` on an existing key overwrites it; there is no delete.

use crate::db::{open_db, open_db_in_memory, DbError, DbResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    InvalidData { key: String, message: String },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData { key, message } => {
                write!(f, "invalid timestamp stored under `{key}`: {message}")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData { .. } => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistent key/value store holding timestamps.
pub trait TimestampStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<DateTime<Utc>>>;
    fn set(&self, key: &str, value: DateTime<Utc>) -> StoreResult<()>;
}

/// SQLite-backed store over the `timestamps` table.
pub struct SqliteTimestampStore {
    conn: Mutex<Connection>,
}

impl SqliteTimestampStore {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // Every statement is atomic, so a poisoned connection is still consistent.
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TimestampStore for SqliteTimestampStore {
    fn get(&self, key: &str) -> StoreResult<Option<DateTime<Utc>>> {
        let conn = self.lock();
        let epoch_ms: Option<i64> = conn
            .query_row(
                "SELECT epoch_ms FROM timestamps WHERE key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        match epoch_ms {
            None => Ok(None),
            Some(ms) => DateTime::from_timestamp_millis(ms)
                .map(Some)
                .ok_or_else(|| StoreError::InvalidData {
                    key: key.to_string(),
                    message: format!("epoch_ms {ms} is out of range"),
                }),
        }
    }

    fn set(&self, key: &str, value: DateTime<Utc>) -> StoreResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO timestamps (key, epoch_ms, updated_at)
             VALUES (?1, ?2, strftime('%s', 'now') * 1000)
             ON CONFLICT(key) DO UPDATE SET
                epoch_ms = excluded.epoch_ms,
                updated_at = excluded.updated_at;",
            params![key, value.timestamp_millis()],
        )?;
        Ok(())
    }
}

/// Process-local store, used in tests and as a fallback when the database
/// cannot be opened.
#[derive(Debug, Default)]
pub struct MemoryTimestampStore {
    values: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemoryTimestampStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimestampStore for MemoryTimestampStore {
    fn get(&self, key: &str) -> StoreResult<Option<DateTime<Utc>>> {
        let values = self
            .values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(values.get(key).copied())
    }

    fn set(&self, key: &str, value: DateTime<Utc>) -> StoreResult<()> {
        let mut values = self
            .values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        values.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryTimestampStore, SqliteTimestampStore, StoreError, TimestampStore};
    use chrono::{DateTime, TimeZone, Utc};

    fn sample() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 10, 30, 0).unwrap()
    }

    #[test]
    fn sqlite_store_returns_none_for_unknown_key() {
        let store = SqliteTimestampStore::open_in_memory().unwrap();
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn sqlite_store_overwrites_existing_key() {
        let store = SqliteTimestampStore::open_in_memory().unwrap();
        store.set("slot", sample()).unwrap();
        let later = sample() + chrono::TimeDelta::minutes(5);
        store.set("slot", later).unwrap();

        assert_eq!(store.get("slot").unwrap(), Some(later));
    }

    #[test]
    fn sqlite_store_reports_unreadable_values() {
        let store = SqliteTimestampStore::open_in_memory().unwrap();
        store.set("slot", sample()).unwrap();
        store
            .lock()
            .execute(
                "UPDATE timestamps SET epoch_ms = 'garbage' WHERE key = 'slot';",
                [],
            )
            .unwrap();

        let err = store.get("slot").unwrap_err();
        assert!(matches!(err, StoreError::Db(_)), "unexpected error: {err}");
    }

    #[test]
    fn memory_store_keeps_keys_independent() {
        let store = MemoryTimestampStore::new();
        store.set("a", sample()).unwrap();

        assert_eq!(store.get("a").unwrap(), Some(sample()));
        assert!(store.get("b").unwrap().is_none());
    }
}
