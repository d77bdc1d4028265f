//! Forward-only schema migrations.
//!
//! A brand-new store is created directly at [`CURRENT_DB_VERSION`] — the
//! chain below only matters for stores carrying an older layout on disk.
//! Each step is idempotent (`CREATE TABLE IF NOT EXISTS` / guarded inserts)
//! and runs inside its own transaction, so a crash mid-migration leaves the
//! store at the last fully-committed version rather than half-migrated.
//!
//! v0 → v1: add the frame-number index the original flat `ocr_entries` table
//! lacked.
//! v1 → v2: backfill `metadata.last_processed_frame` from `MAX(frame_num)`.
//! v2 → v3: normalize `ocr_entries` into `text_entries` (deduplicated
//! strings) and `text_instances` (per-frame occurrences), drop the old
//! table, and `VACUUM`. This step stamps the store at version 4, not 3 —
//! v3 names the table layout it introduces, 4 is this workspace's version
//! number for "normalized and current".

use rusqlite::Connection;

use crate::error::DatabaseError;
use crate::schema::{CREATE_CURRENT_SCHEMA, CURRENT_DB_VERSION};

/// Bring `conn` to [`CURRENT_DB_VERSION`], creating a fresh schema if the
/// database has no tables at all.
pub fn run_all(conn: &mut Connection) -> Result<(), DatabaseError> {
    match detect_version(conn)? {
        None => create_fresh(conn),
        Some(version) if version == CURRENT_DB_VERSION => Ok(()),
        Some(version) if version > CURRENT_DB_VERSION => Err(DatabaseError::UnsupportedVersion {
            found: version,
            supported: CURRENT_DB_VERSION,
        }),
        Some(mut version) => {
            if version == 0 {
                migrate_v0_to_v1(conn)?;
                version = 1;
            }
            if version == 1 {
                migrate_v1_to_v2(conn)?;
                version = 2;
            }
            if version == 2 {
                migrate_v2_to_v4_normalize(conn)?;
                version = 4;
            }
            debug_assert_eq!(version, CURRENT_DB_VERSION);
            Ok(())
        }
    }
}

/// `None` means there is nothing here yet (fresh database). `Some(0)` is the
/// legacy pre-metadata `ocr_entries` layout.
fn detect_version(conn: &Connection) -> Result<Option<i64>, DatabaseError> {
    if table_exists(conn, "metadata")? {
        let raw: String = conn.query_row(
            "SELECT value FROM metadata WHERE key = 'version'",
            [],
            |row| row.get(0),
        )?;
        let version: i64 = raw
            .parse()
            .map_err(|_| DatabaseError::Migration(format!("metadata.version is not a valid integer: {raw:?}")))?;
        return Ok(Some(version));
    }
    if table_exists(conn, "ocr_entries")? {
        return Ok(Some(0));
    }
    Ok(None)
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool, DatabaseError> {
    let exists = conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |_| Ok(()),
    );
    match exists {
        Ok(()) => Ok(true),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn create_fresh(conn: &mut Connection) -> Result<(), DatabaseError> {
    tracing::info!("initializing new store at schema version {}", CURRENT_DB_VERSION);
    let tx = conn.transaction()?;
    tx.execute_batch(CREATE_CURRENT_SCHEMA)?;
    set_version(&tx, CURRENT_DB_VERSION)?;
    set_metadata(&tx, "last_processed_frame", "-1")?;
    tx.commit()?;
    Ok(())
}

fn migrate_v0_to_v1(conn: &mut Connection) -> Result<(), DatabaseError> {
    tracing::info!("migrating store v0 -> v1 (indexing ocr_entries)");
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS ocr_entries_frame_num_idx ON ocr_entries(frame_num);
        "#,
    )?;
    set_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

fn migrate_v1_to_v2(conn: &mut Connection) -> Result<(), DatabaseError> {
    tracing::info!("migrating store v1 -> v2 (backfilling last_processed_frame)");
    let tx = conn.transaction()?;
    let max_frame: Option<i64> = tx.query_row("SELECT MAX(frame_num) FROM ocr_entries", [], |row| row.get(0))?;
    set_metadata(&tx, "last_processed_frame", &max_frame.unwrap_or(-1).to_string())?;
    set_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}

fn migrate_v2_to_v4_normalize(conn: &mut Connection) -> Result<(), DatabaseError> {
    tracing::info!("migrating store v2 -> v4 (normalizing ocr_entries into text_entries/text_instances)");
    {
        let tx = conn.transaction()?;
        tx.execute_batch(
            r#"
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
            "#,
        )?;

        {
            let mut select_old = tx.prepare("SELECT frame_num, left, top, right, bottom, confidence, ocr_text FROM ocr_entries")?;
            let mut insert_text = tx.prepare("INSERT OR IGNORE INTO text_entries(value) VALUES (?1)")?;
            let mut lookup_text_id = tx.prepare("SELECT id FROM text_entries WHERE value = ?1")?;
            let mut insert_instance = tx.prepare(
                "INSERT INTO text_instances(text_entry_id, frame_num, left, top, right, bottom, confidence) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;

            let mut rows = select_old.query([])?;
            while let Some(row) = rows.next()? {
                let frame_num: i64 = row.get(0)?;
                let left: Option<i32> = row.get(1)?;
                let top: Option<i32> = row.get(2)?;
                let right: Option<i32> = row.get(3)?;
                let bottom: Option<i32> = row.get(4)?;
                let confidence: Option<f64> = row.get(5)?;
                let text: String = row.get(6)?;

                insert_text.execute([&text])?;
                let text_entry_id: i64 = lookup_text_id.query_row([&text], |r| r.get(0))?;
                insert_instance.execute(rusqlite::params![
                    text_entry_id,
                    frame_num,
                    left,
                    top,
                    right,
                    bottom,
                    confidence
                ])?;
            }
        }

        tx.execute_batch("DROP TABLE ocr_entries;")?;
        set_version(&tx, 4)?;
        tx.commit()?;
    }
    conn.execute_batch("VACUUM;")?;
    Ok(())
}

fn set_version(conn: &Connection, version: i64) -> Result<(), DatabaseError> {
    set_metadata(conn, "version", &version.to_string())
}

fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO metadata(key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_v0_store() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE ocr_entries (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                frame_num  INTEGER NOT NULL,
                left       INTEGER,
                top        INTEGER,
                right      INTEGER,
                bottom     INTEGER,
                confidence REAL,
                ocr_text   TEXT NOT NULL
            );
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn fresh_database_lands_directly_on_current_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_all(&mut conn).unwrap();
        assert_eq!(detect_version(&conn).unwrap(), Some(CURRENT_DB_VERSION));
    }

    #[test]
    fn running_migrations_twice_is_a_no_op() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_all(&mut conn).unwrap();
        run_all(&mut conn).unwrap();
        assert_eq!(detect_version(&conn).unwrap(), Some(CURRENT_DB_VERSION));
    }

    #[test]
    fn legacy_store_migrates_through_the_full_chain() {
        let mut conn = legacy_v0_store();
        conn.execute(
            "INSERT INTO ocr_entries (frame_num, left, top, right, bottom, confidence, ocr_text) \
             VALUES (5, 0, 0, 10, 10, 95.0, 'hello')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO ocr_entries (frame_num, left, top, right, bottom, confidence, ocr_text) \
             VALUES (5, 20, 0, 30, 10, 91.0, 'hello')",
            [],
        )
        .unwrap();

        run_all(&mut conn).unwrap();

        assert_eq!(detect_version(&conn).unwrap(), Some(CURRENT_DB_VERSION));

        let text_entries: i64 = conn.query_row("SELECT COUNT(*) FROM text_entries", [], |r| r.get(0)).unwrap();
        assert_eq!(text_entries, 1, "duplicate text should collapse to one entry");

        let instances: i64 = conn.query_row("SELECT COUNT(*) FROM text_instances", [], |r| r.get(0)).unwrap();
        assert_eq!(instances, 2);

        let last_processed: String = conn
            .query_row("SELECT value FROM metadata WHERE key = 'last_processed_frame'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(last_processed, "5");

        let still_there: Result<i64, _> = conn.query_row("SELECT COUNT(*) FROM ocr_entries", [], |r| r.get(0));
        assert!(still_there.is_err(), "ocr_entries should have been dropped");
    }

    #[test]
    fn a_corrupt_version_string_is_reported_as_a_migration_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_CURRENT_SCHEMA).unwrap();
        set_metadata(&conn, "version", "not-a-number").unwrap();
        set_metadata(&conn, "last_processed_frame", "-1").unwrap();

        let err = detect_version(&conn).unwrap_err();
        assert!(matches!(err, DatabaseError::Migration(_)));
    }

    #[test]
    fn a_version_newer_than_supported_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_CURRENT_SCHEMA).unwrap();
        set_version(&conn, CURRENT_DB_VERSION + 1).unwrap();
        set_metadata(&conn, "last_processed_frame", "-1").unwrap();

        let err = run_all(&mut conn).unwrap_err();
        assert!(matches!(err, DatabaseError::UnsupportedVersion { .. }));
    }
}
