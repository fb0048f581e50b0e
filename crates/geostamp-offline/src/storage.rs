//! SQLite-backed named response stores.
//!
//! Several named stores can exist side by side; the worker treats exactly one
//! of them as current and deletes the rest on activation.

use std::path::Path;

use geostamp_core::{RusqliteErrorExt, StorageError};
use rusqlite::{params, Connection, OptionalExtension};

use crate::request::CachedResponse;

fn db<T>(result: rusqlite::Result<T>) -> Result<T, StorageError> {
    result.map_err(RusqliteErrorExt::into_storage_error)
}

pub struct CacheStorage {
    conn: Connection,
}

impl CacheStorage {
    /// Open (or create) the store database at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = db(Connection::open(path))?;
        let storage = Self { conn };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Create an in-memory store database.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = db(Connection::open_in_memory())?;
        let storage = Self { conn };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        db(self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS caches (
                name TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS entries (
                cache_name TEXT NOT NULL REFERENCES caches(name) ON DELETE CASCADE,
                url TEXT NOT NULL,
                status INTEGER NOT NULL,
                headers_json TEXT NOT NULL,
                body BLOB NOT NULL,
                cached_at INTEGER NOT NULL,
                PRIMARY KEY (cache_name, url)
            );

            CREATE INDEX IF NOT EXISTS idx_entries_url ON entries(url);
            "#,
        ))
    }

    /// Create the named store if it doesn't exist yet.
    pub fn open(&self, name: &str) -> Result<(), StorageError> {
        let now = chrono::Utc::now().timestamp_millis();
        db(self.conn.execute(
            "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
            params![name, now],
        ))?;
        Ok(())
    }

    pub fn has(&self, name: &str) -> Result<bool, StorageError> {
        let found: Option<i64> = db(self
            .conn
            .query_row("SELECT 1 FROM caches WHERE name = ?1", params![name], |row| {
                row.get(0)
            })
            .optional())?;
        Ok(found.is_some())
    }

    /// Store names, oldest first.
    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut stmt =
            db(self
                .conn
                .prepare("SELECT name FROM caches ORDER BY created_at, rowid"))?;
        let rows = db(stmt.query_map([], |row| row.get(0)))?;
        db(rows.collect())
    }

    /// Delete a store and everything in it. Returns whether it existed.
    pub fn delete(&self, name: &str) -> Result<bool, StorageError> {
        let removed = db(self
            .conn
            .execute("DELETE FROM caches WHERE name = ?1", params![name]))?;
        Ok(removed > 0)
    }

    /// Store one response under its URL, replacing any previous entry.
    pub fn put(&mut self, name: &str, response: &CachedResponse) -> Result<(), StorageError> {
        self.put_all(name, std::slice::from_ref(response))
    }

    /// Store all responses in a single transaction: either every entry is
    /// written or none is.
    pub fn put_all(&mut self, name: &str, responses: &[CachedResponse]) -> Result<(), StorageError> {
        let now = chrono::Utc::now().timestamp_millis();
        let tx = db(self.conn.transaction())?;

        db(tx.execute(
            "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
            params![name, now],
        ))?;

        for response in responses {
            let headers_json = serde_json::to_string(&response.headers)
                .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
            db(tx.execute(
                r#"
                INSERT OR REPLACE INTO entries
                (cache_name, url, status, headers_json, body, cached_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    name,
                    response.url,
                    response.status,
                    headers_json,
                    response.body,
                    now,
                ],
            ))?;
        }

        db(tx.commit())
    }

    /// Look up a URL across all stores, oldest store first.
    pub fn match_url(&self, url: &str) -> Result<Option<CachedResponse>, StorageError> {
        db(self
            .conn
            .query_row(
                r#"
                SELECT e.url, e.status, e.headers_json, e.body
                FROM entries e JOIN caches c ON c.name = e.cache_name
                WHERE e.url = ?1
                ORDER BY c.created_at, c.rowid
                LIMIT 1
                "#,
                params![url],
                Self::row_to_response,
            )
            .optional())
    }

    /// Look up a URL in one named store.
    pub fn match_in(&self, name: &str, url: &str) -> Result<Option<CachedResponse>, StorageError> {
        db(self
            .conn
            .query_row(
                "SELECT url, status, headers_json, body FROM entries WHERE cache_name = ?1 AND url = ?2",
                params![name, url],
                Self::row_to_response,
            )
            .optional())
    }

    pub fn entry_count(&self, name: &str) -> Result<usize, StorageError> {
        let count: i64 = db(self.conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE cache_name = ?1",
            params![name],
            |row| row.get(0),
        ))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn row_to_response(row: &rusqlite::Row) -> rusqlite::Result<CachedResponse> {
        let headers_json: String = row.get(2)?;
        Ok(CachedResponse {
            url: row.get(0)?,
            status: row.get(1)?,
            headers: serde_json::from_str(&headers_json).unwrap_or_default(),
            body: row.get(3)?,
        })
    }
}
