//! SQLite-backed persistence.
//!
//! Provides:
//! - the key-value table behind the background processes' markers
//! - the planner state document (tasks, weekly goals, score)

use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use super::{data_dir, migrations};
use crate::error::StorageError;
use crate::kv::KeyValueStore;
use crate::store::PlannerState;

const STATE_KEY: &str = "state";

/// SQLite database for dashboard state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/dayboard.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        Self::open_at(&data_dir()?.join("dayboard.db"))
    }

    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        migrations::migrate(&conn)?;
        Ok(Self { conn })
    }

    /// Load the persisted planner state, if any was saved.
    ///
    /// # Errors
    /// Returns [`StorageError::Corrupt`] if the stored document does not decode.
    pub fn load_state(&self) -> Result<Option<PlannerState>, StorageError> {
        let document: Option<String> = self
            .conn
            .query_row("SELECT document FROM state WHERE id = 1", [], |row| row.get(0))
            .optional()?;
        document
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
                    key: STATE_KEY.into(),
                    message: e.to_string(),
                })
            })
            .transpose()
    }

    /// Replace the persisted planner state.
    pub fn save_state(&self, state: &PlannerState, now: NaiveDateTime) -> Result<(), StorageError> {
        let document = serde_json::to_string(state).map_err(|e| StorageError::Corrupt {
            key: STATE_KEY.into(),
            message: e.to_string(),
        })?;
        self.conn.execute(
            "INSERT OR REPLACE INTO state (id, document, updated_at) VALUES (1, ?1, ?2)",
            params![document, now.format("%Y-%m-%dT%H:%M:%S").to_string()],
        )?;
        Ok(())
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let value = stmt
            .query_row(params![key], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}
