//! Database connection and schema management

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::StoreError;

/// Current schema version, stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Schema migrations; entry `n` upgrades version `n` to `n + 1`
const MIGRATIONS: &[&str] = &[
    // 0 -> 1
    r#"
    CREATE TABLE IF NOT EXISTS outbound (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        enqueued_at INTEGER NOT NULL,
        sent_at INTEGER,
        air_time_ms INTEGER,
        CHECK ((sent_at IS NULL) = (air_time_ms IS NULL))
    );
    CREATE INDEX IF NOT EXISTS idx_outbound_unsent ON outbound(id) WHERE sent_at IS NULL;

    CREATE TABLE IF NOT EXISTS inbound (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        received_at INTEGER NOT NULL,
        rssi INTEGER NOT NULL,
        snr REAL NOT NULL
    );

    CREATE TABLE IF NOT EXISTS nodes (
        node_id INTEGER PRIMARY KEY NOT NULL CHECK (node_id > 0),
        node_name TEXT NOT NULL,
        is_local INTEGER NOT NULL DEFAULT 0
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_single_local ON nodes(is_local) WHERE is_local = 1;
    "#,
];

/// Handle to the message database
///
/// A single connection, owned by whoever drives the queue. Every operation
/// commits before returning.
pub struct MessageStore {
    pub(crate) conn: Connection,
}

impl MessageStore {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self { conn };
        store.migrate()?;
        info!("Opened message store at {}", path.display());
        Ok(store)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.migrate()?;
        Ok(store)
    }

    /// Schema version recorded in the database
    pub fn schema_version(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        let found = self.schema_version()?;
        if found > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                found,
                supported: SCHEMA_VERSION,
            });
        }

        for (version, sql) in MIGRATIONS.iter().enumerate().skip(found as usize) {
            let next = version as i64 + 1;
            debug!("Migrating message store schema {} -> {}", version, next);
            let tx = self.conn.unchecked_transaction()?;
            tx.execute_batch(sql)?;
            tx.pragma_update(None, "user_version", next)?;
            tx.commit()?;
        }
        Ok(())
    }
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Current time truncated to the millisecond precision stored on disk
pub(crate) fn now_millis() -> DateTime<Utc> {
    from_millis(to_millis(Utc::now()))
}
