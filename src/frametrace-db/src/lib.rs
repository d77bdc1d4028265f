//! Versioned, transactional result store.
//!
//! `Database` wraps a single SQLite connection behind a mutex: the store is
//! I/O-bound and SQLite itself serializes writers, so one lock around
//! `store`/`is_frame_processed`/`advance_progress`/`find_text` is enough to
//! let multiple OCR workers share a `Database` safely without a bespoke
//! writer-actor layer.

mod error;
mod migrations;
mod queries;
mod schema;

pub use error::DatabaseError;
pub use queries::{StoreStats, TextInstanceRow};
pub use schema::CURRENT_DB_VERSION;

use std::path::Path;
use std::sync::Mutex;

use frametrace_ocr::OcrResult;
use rusqlite::Connection;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a store at `path`, migrating it forward if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        tracing::info!(?path, "opening store");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;")?;
        migrations::run_all(&mut conn)?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory store. Used by tests and by any caller that wants a
    /// disposable store.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let mut conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::run_all(&mut conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Persist an OCR result. Safe to call from any worker thread.
    pub fn store(&self, result: &OcrResult) -> Result<(), DatabaseError> {
        let mut conn = self.conn.lock().unwrap();
        queries::store(&mut conn, result)
    }

    pub fn is_frame_processed(&self, frame_number: i64) -> Result<bool, DatabaseError> {
        let conn = self.conn.lock().unwrap();
        queries::is_frame_processed(&conn, frame_number)
    }

    /// The frame a fresh run should start decoding from.
    pub fn starting_frame(&self) -> Result<i64, DatabaseError> {
        let conn = self.conn.lock().unwrap();
        queries::starting_frame(&conn)
    }

    /// Advance the resume pointer without inserting any rows — used when a
    /// worker skips a frame it already knows was processed.
    pub fn advance_progress(&self, frame_number: i64) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().unwrap();
        queries::advance_progress(&conn, frame_number)
    }

    pub fn find_text(&self, pattern: &str) -> Result<Vec<TextInstanceRow>, DatabaseError> {
        let conn = self.conn.lock().unwrap();
        queries::find_text(&conn, pattern)
    }

    pub fn stats(&self) -> Result<StoreStats, DatabaseError> {
        let conn = self.conn.lock().unwrap();
        queries::stats(&conn)
    }
}

#[cfg(test)]
impl Database {
    pub(crate) fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        self.conn.get_mut().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_lands_on_current_version() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.stats().unwrap().schema_version, CURRENT_DB_VERSION);
    }

    #[test]
    fn fresh_store_resumes_from_frame_zero() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.starting_frame().unwrap(), 0);
    }
}
