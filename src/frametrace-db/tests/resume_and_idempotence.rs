//! Integration tests against a file-backed store: resuming after a process
//! restart, and idempotence of `store()` across repeated calls for the same
//! frame — the scenario a worker hits when a store write is re-sent after a
//! retry or a racing duplicate.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use frametrace_db::Database;
use frametrace_ocr::{OcrResult, TextEntry};

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// A path under the system temp dir, unique to this test run, cleaned up on
/// drop.
struct TempDbPath(PathBuf);

impl TempDbPath {
    fn new() -> Self {
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!("frametrace_db_test_{}_{}.sqlite", std::process::id(), id));
        Self(path)
    }
}

impl Drop for TempDbPath {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
        let _ = std::fs::remove_file(self.0.with_extension("sqlite-wal"));
        let _ = std::fs::remove_file(self.0.with_extension("sqlite-shm"));
    }
}

fn entry(text: &str) -> TextEntry {
    TextEntry { left: 0, top: 0, right: 10, bottom: 10, confidence: 95.0, text: text.to_string() }
}

#[test]
fn a_fresh_run_resumes_from_where_a_prior_run_left_off() {
    let path = TempDbPath::new();

    {
        let db = Database::open(&path.0).unwrap();
        assert_eq!(db.starting_frame().unwrap(), 0);
        db.store(&OcrResult { frame_number: 10, entries: vec![entry("hello")] }).unwrap();
        db.store(&OcrResult { frame_number: 11, entries: vec![] }).unwrap();
    }

    // Reopen, as a restarted process would.
    let db = Database::open(&path.0).unwrap();
    assert_eq!(db.starting_frame().unwrap(), 12);
    assert!(db.is_frame_processed(11).unwrap());
    assert!(!db.is_frame_processed(12).unwrap());

    let hits = db.find_text("%hel%").unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn storing_the_same_frame_twice_across_a_reopen_does_not_duplicate_rows() {
    let path = TempDbPath::new();

    let result = OcrResult { frame_number: 3, entries: vec![entry("hello"), entry("world")] };

    {
        let db = Database::open(&path.0).unwrap();
        db.store(&result).unwrap();
    }

    // A worker that re-sends the same already-processed frame after restart
    // must not double the store's text_instances.
    let db = Database::open(&path.0).unwrap();
    db.store(&result).unwrap();

    let stats = db.stats().unwrap();
    assert_eq!(stats.text_instance_count, 2);
    assert_eq!(stats.distinct_text_count, 2);
}

#[test]
fn concurrent_workers_racing_a_duplicate_frame_converge_on_one_copy() {
    let path = TempDbPath::new();
    let db = std::sync::Arc::new(Database::open(&path.0).unwrap());

    let make_result = || OcrResult { frame_number: 7, entries: vec![entry("race")] };

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let db = std::sync::Arc::clone(&db);
            std::thread::spawn(move || db.store(&make_result()).unwrap())
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let stats = db.stats().unwrap();
    assert_eq!(stats.text_instance_count, 1);
    assert_eq!(stats.distinct_text_count, 1);
}
