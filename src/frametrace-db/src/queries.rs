//! Store operations: transactional inserts, the resume pointer, and
//! substring search.

use rusqlite::{params, Connection};

use frametrace_ocr::OcrResult;

use crate::error::DatabaseError;
use crate::schema::TextInstanceRow;

/// Persist an OCR result. An empty `entries` list still advances the resume
/// pointer — it records that the frame was examined, even though nothing
/// worth keeping was found.
///
/// Idempotent: a `frame_number` at or below the resume pointer is already
/// accounted for, so calling this twice for the same frame is a no-op the
/// second time rather than inserting duplicate `text_instances` rows.
pub fn store(conn: &mut Connection, result: &OcrResult) -> Result<(), DatabaseError> {
    if is_frame_processed(conn, result.frame_number)? {
        return Ok(());
    }

    let tx = conn.transaction()?;

    {
        let mut insert_text = tx.prepare_cached("INSERT OR IGNORE INTO text_entries(value) VALUES (?1)")?;
        let mut lookup_text_id = tx.prepare_cached("SELECT id FROM text_entries WHERE value = ?1")?;
        let mut insert_instance = tx.prepare_cached(
            "INSERT INTO text_instances(text_entry_id, frame_num, left, top, right, bottom, confidence) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;

        for entry in &result.entries {
            insert_text.execute(params![entry.text])?;
            let text_entry_id: i64 = lookup_text_id.query_row(params![entry.text], |row| row.get(0))?;
            insert_instance.execute(params![
                text_entry_id,
                result.frame_number,
                entry.left,
                entry.top,
                entry.right,
                entry.bottom,
                entry.confidence as f64,
            ])?;
        }
    }

    advance_progress_tx(&tx, result.frame_number)?;
    tx.commit()?;
    Ok(())
}

/// Whether `frame_number` has already been persisted, per the monotonic
/// `max(seen)` progress pointer.
pub fn is_frame_processed(conn: &Connection, frame_number: i64) -> Result<bool, DatabaseError> {
    Ok(frame_number <= last_processed_frame(conn)?)
}

/// The next frame a fresh run should start decoding from: one past the
/// highest frame number ever committed, or 0 for a store that has never
/// processed anything.
pub fn starting_frame(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(last_processed_frame(conn)? + 1)
}

pub fn last_processed_frame(conn: &Connection) -> Result<i64, DatabaseError> {
    let value: String = conn.query_row(
        "SELECT value FROM metadata WHERE key = 'last_processed_frame'",
        [],
        |row| row.get(0),
    )?;
    Ok(value.parse().unwrap_or(-1))
}

/// Advance the resume pointer outside of a `store` call, e.g. when a worker
/// skips an already-processed frame but the pointer should still reflect it
/// having been seen.
pub fn advance_progress(conn: &Connection, frame_number: i64) -> Result<(), DatabaseError> {
    advance_progress_tx(conn, frame_number)
}

fn advance_progress_tx(conn: &Connection, frame_number: i64) -> Result<(), DatabaseError> {
    let current = last_processed_frame(conn)?;
    if frame_number > current {
        conn.execute(
            "UPDATE metadata SET value = ?1 WHERE key = 'last_processed_frame'",
            params![frame_number.to_string()],
        )?;
    }
    Ok(())
}

/// Substring search over recognized text. `pattern` is passed straight to
/// SQL `LIKE`, so callers supply their own `%` wildcards.
pub fn find_text(conn: &Connection, pattern: &str) -> Result<Vec<TextInstanceRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        r#"SELECT ti.frame_num, ti.left, ti.top, ti.right, ti.bottom, ti.confidence, te.value
           FROM text_instances ti
           JOIN text_entries te ON te.id = ti.text_entry_id
           WHERE te.value LIKE ?1
           ORDER BY ti.frame_num"#,
    )?;

    let rows = stmt
        .query_map(params![pattern], |row| {
            Ok(TextInstanceRow {
                frame_number: row.get(0)?,
                left: row.get(1)?,
                top: row.get(2)?,
                right: row.get(3)?,
                bottom: row.get(4)?,
                confidence: row.get::<_, f64>(5)? as f32,
                text: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Summary statistics for the `status` CLI subcommand.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreStats {
    pub schema_version: i64,
    pub last_processed_frame: i64,
    pub text_instance_count: i64,
    pub distinct_text_count: i64,
}

pub fn stats(conn: &Connection) -> Result<StoreStats, DatabaseError> {
    let schema_version: String = conn.query_row(
        "SELECT value FROM metadata WHERE key = 'version'",
        [],
        |row| row.get(0),
    )?;
    let text_instance_count: i64 = conn.query_row("SELECT COUNT(*) FROM text_instances", [], |row| row.get(0))?;
    let distinct_text_count: i64 = conn.query_row("SELECT COUNT(*) FROM text_entries", [], |row| row.get(0))?;

    Ok(StoreStats {
        schema_version: schema_version.parse().unwrap_or(0),
        last_processed_frame: last_processed_frame(conn)?,
        text_instance_count,
        distinct_text_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use frametrace_ocr::TextEntry;

    fn entry(text: &str) -> TextEntry {
        TextEntry { left: 0, top: 0, right: 10, bottom: 10, confidence: 95.0, text: text.to_string() }
    }

    #[test]
    fn storing_a_result_advances_progress_and_dedupes_text() {
        let mut db = Database::open_in_memory().unwrap();

        store(
            db.connection_mut(),
            &OcrResult { frame_number: 5, entries: vec![entry("hello"), entry("world")] },
        )
        .unwrap();
        store(
            db.connection_mut(),
            &OcrResult { frame_number: 6, entries: vec![entry("hello")] },
        )
        .unwrap();

        assert_eq!(last_processed_frame(&db.connection()).unwrap(), 6);
        assert!(is_frame_processed(&db.connection(), 6).unwrap());
        assert!(!is_frame_processed(&db.connection(), 7).unwrap());

        let s = stats(&db.connection()).unwrap();
        assert_eq!(s.text_instance_count, 3);
        assert_eq!(s.distinct_text_count, 2);
    }

    #[test]
    fn empty_result_still_advances_the_pointer() {
        let mut db = Database::open_in_memory().unwrap();
        store(db.connection_mut(), &OcrResult { frame_number: 42, entries: vec![] }).unwrap();
        assert_eq!(starting_frame(&db.connection()).unwrap(), 43);
    }

    #[test]
    fn storing_the_same_frame_twice_does_not_duplicate_instances() {
        let mut db = Database::open_in_memory().unwrap();

        let result = OcrResult { frame_number: 5, entries: vec![entry("hello")] };
        store(db.connection_mut(), &result).unwrap();
        store(db.connection_mut(), &result).unwrap();

        let s = stats(&db.connection()).unwrap();
        assert_eq!(s.text_instance_count, 1);
        assert_eq!(s.distinct_text_count, 1);
    }

    #[test]
    fn substring_search_matches_only_containing_entries() {
        let mut db = Database::open_in_memory().unwrap();
        store(
            db.connection_mut(),
            &OcrResult {
                frame_number: 1,
                entries: vec![entry("hello"), entry("world"), entry("help")],
            },
        )
        .unwrap();

        let hits = find_text(&db.connection(), "%hel%").unwrap();
        let texts: Vec<_> = hits.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts.len(), 2);
        assert!(texts.contains(&"hello"));
        assert!(texts.contains(&"help"));
    }
}
