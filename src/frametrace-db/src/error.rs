//! Database error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to create database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("migration step failed: {0}")]
    Migration(String),

    #[error("store schema version {found} is newer than this binary supports (max {supported})")]
    UnsupportedVersion { found: i64, supported: i64 },
}
