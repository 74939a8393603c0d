// SQLite persistence layer for client-local state.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite-backed key-value store for persisted JSON values (conversation
/// snapshots and the auth session). Writes are last-writer-wins.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure the schema
    /// exists. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS local_state (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Persist an arbitrary JSON value under `key`. Uses INSERT OR REPLACE so
    /// repeated saves overwrite the previous value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn();
        let json_str =
            serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO local_state (key, value, updated_at)
             VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
            params![key, json_str],
        )
        .context("failed to save state")?;
        Ok(())
    }

    /// Load a previously saved JSON value by `key`. Returns `None` if the key
    /// does not exist.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let json_str: Option<String> = conn
            .query_row(
                "SELECT value FROM local_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query local state")?;

        match json_str {
            Some(s) => {
                let value: serde_json::Value =
                    serde_json::from_str(&s).context("failed to deserialize state value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Remove the value stored under `key`. Returns `true` if a row was
    /// deleted.
    pub fn delete_state(&self, key: &str) -> Result<bool> {
        let conn = self.conn();
        let removed = conn
            .execute("DELETE FROM local_state WHERE key = ?1", params![key])
            .context("failed to delete state")?;
        Ok(removed > 0)
    }

    /// List all stored keys in lexical order.
    pub fn keys(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT key FROM local_state ORDER BY key")
            .context("failed to prepare keys query")?;
        let keys = stmt
            .query_map([], |row| row.get(0))
            .context("failed to query keys")?
            .collect::<std::result::Result<Vec<String>, _>>()
            .context("failed to map key rows")?;
        Ok(keys)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory db")
    }

    #[test]
    fn open_creates_table() {
        let db = test_db();
        let conn = db.conn();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'local_state'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn save_and_load_state_round_trip() {
        let db = test_db();
        let value = json!({"token": "abc", "expiry": "2030-01-01T00:00:00Z"});
        db.save_state("auth.session", &value).unwrap();
        assert_eq!(db.load_state("auth.session").unwrap(), Some(value));
    }

    #[test]
    fn load_state_returns_none_for_missing_key() {
        let db = test_db();
        assert_eq!(db.load_state("nope").unwrap(), None);
    }

    #[test]
    fn save_state_overwrites_previous_value() {
        let db = test_db();
        db.save_state("k", &json!(1)).unwrap();
        db.save_state("k", &json!(2)).unwrap();
        assert_eq!(db.load_state("k").unwrap(), Some(json!(2)));
        assert_eq!(db.keys().unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn delete_state_removes_key() {
        let db = test_db();
        db.save_state("chat.daily", &json!({"messages": []})).unwrap();
        assert!(db.delete_state("chat.daily").unwrap());
        assert!(!db.delete_state("chat.daily").unwrap());
        assert_eq!(db.load_state("chat.daily").unwrap(), None);
    }

    #[test]
    fn keys_are_sorted() {
        let db = test_db();
        db.save_state("chat.weekly", &json!(null)).unwrap();
        db.save_state("auth.session", &json!(null)).unwrap();
        db.save_state("chat.daily", &json!(null)).unwrap();
        assert_eq!(
            db.keys().unwrap(),
            vec!["auth.session", "chat.daily", "chat.weekly"]
        );
    }
}
