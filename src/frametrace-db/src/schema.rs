//! Schema definitions and row types.
//!
//! `metadata` is a single-row-per-key table (`version`, `last_processed_frame`).
//! `text_entries` deduplicates recognized strings; `text_instances` links a
//! deduplicated string to every frame it appeared in, with its bounding box
//! and confidence at that occurrence.

/// Schema version a freshly created store is initialized at, and the version
/// every older store is migrated forward to. See [`crate::migrations`] for
/// why this is 4 rather than 3 — the final normalization step is still
/// called "v3" (it carries the v3 table layout) but stamps the store at
/// version 4.
pub const CURRENT_DB_VERSION: i64 = 4;

pub const CREATE_CURRENT_SCHEMA: &str = r#"
CREATE TABLE metadata (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE text_entries (
    id    INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    value TEXT UNIQUE NOT NULL
);

CREATE INDEX text_entries_value_idx ON text_entries(value);

CREATE TABLE text_instances (
    id            INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    text_entry_id INTEGER NOT NULL,
    frame_num     INTEGER NOT NULL,
    left          INTEGER,
    top           INTEGER,
    right         INTEGER,
    bottom        INTEGER,
    confidence    REAL,

    FOREIGN KEY(text_entry_id)
        REFERENCES text_entries(id)
        ON DELETE CASCADE
);

CREATE INDEX text_instances_frame_num_idx ON text_instances(frame_num);
"#;

/// One recognized word as stored: the deduplicated text plus its occurrence
/// at a specific frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TextInstanceRow {
    pub frame_number: i64,
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub confidence: f32,
    pub text: String,
}
