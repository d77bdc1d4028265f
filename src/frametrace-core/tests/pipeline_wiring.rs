//! End-to-end wiring test covering queue, OCR worker, and store together,
//! without a real video file — stands in for the decoder by feeding the
//! queue directly, the way `frametrace-ocr`'s own worker tests do.

use std::sync::Arc;

use frametrace_db::Database;
use frametrace_meter::SpeedMeter;
use frametrace_ocr::{FixedProvider, TextEntry};
use frametrace_queue::FrameQueue;

#[test]
fn ocr_results_from_a_fixed_provider_land_in_the_store() {
    let queue = FrameQueue::new(2, 4, 4, 12);
    let db = Arc::new(Database::open_in_memory().unwrap());
    let meter = Arc::new(SpeedMeter::new(0, |_| {}));

    let provider = FixedProvider::new(vec![TextEntry {
        left: 0,
        top: 0,
        right: 10,
        bottom: 10,
        confidence: 95.0,
        text: "hello".to_string(),
    }]);

    // Hand two frames to the queue, as the decoder would, then shut it down
    // so the worker loop below drains and returns.
    for frame_number in [0, 1] {
        let mut buf = queue.take_producer().unwrap();
        buf.fill(frame_number, 4, 4, 12, &[0u8; 48]);
        queue.return_consumer(buf);
    }
    queue.shutdown();

    {
        let db = Arc::clone(&db);
        let meter = Arc::clone(&meter);
        frametrace_ocr::run(
            &queue,
            &provider,
            |n| db.is_frame_processed(n).unwrap_or(false),
            |n| meter.record_skip(n),
            |n| meter.record_ocr(n),
            |result| db.store(&result).unwrap(),
        );
    }

    let stats = db.stats().unwrap();
    assert_eq!(stats.last_processed_frame, 1);
    assert_eq!(stats.distinct_text_count, 1);
    assert_eq!(stats.text_instance_count, 2);

    let hits = db.find_text("%hel%").unwrap();
    assert_eq!(hits.len(), 2);
}

#[test]
fn a_frame_already_marked_processed_is_skipped_not_reocred() {
    let queue = FrameQueue::new(1, 4, 4, 12);
    let db = Database::open_in_memory().unwrap();
    db.store(&frametrace_ocr::OcrResult { frame_number: 5, entries: vec![] }).unwrap();

    let mut buf = queue.take_producer().unwrap();
    buf.fill(5, 4, 4, 12, &[0u8; 48]);
    queue.return_consumer(buf);
    queue.shutdown();

    let provider = FixedProvider::new(vec![TextEntry {
        left: 0,
        top: 0,
        right: 1,
        bottom: 1,
        confidence: 50.0,
        text: "should-not-be-stored".to_string(),
    }]);

    frametrace_ocr::run(
        &queue,
        &provider,
        |n| db.is_frame_processed(n).unwrap_or(false),
        |_| {},
        |_| panic!("record_ocr should not run for an already-processed frame"),
        |_| panic!("on_result should not run for an already-processed frame"),
    );

    assert_eq!(db.stats().unwrap().text_instance_count, 0);
}
