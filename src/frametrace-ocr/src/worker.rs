use frametrace_queue::FrameQueue;

use crate::provider::OcrProvider;
use crate::types::{OcrResult, TextEntry};

/// Drain `queue`'s consumer side until shutdown, running every frame through
/// `provider` unless `is_already_processed` says to skip it.
///
/// `record_skip`/`record_ocr` report into the speed meter; `on_result` is the
/// caller's persistence hook (typically backed by the result store). All
/// four closures may be called concurrently from multiple worker threads —
/// they must be `Sync`-safe on the caller's side (an `Arc<Mutex<_>>` or a
/// lock-free aggregator).
pub fn run<P>(
    queue: &FrameQueue,
    provider: &P,
    mut is_already_processed: impl FnMut(i64) -> bool,
    mut record_skip: impl FnMut(i64),
    mut record_ocr: impl FnMut(i64),
    mut on_result: impl FnMut(OcrResult),
) where
    P: OcrProvider + ?Sized,
{
    while let Some(buffer) = queue.take_consumer() {
        let frame_number = buffer.frame_number;

        if is_already_processed(frame_number) {
            record_skip(frame_number);
            queue.return_producer(buffer);
            continue;
        }

        let entries = match provider.do_ocr(&buffer.data, buffer.width, buffer.height, buffer.bytes_per_line) {
            Ok(raw) => filter_entries(raw, P::MIN_LETTERS_THRESHOLD),
            Err(e) => {
                tracing::warn!(frame_number, error = %e, "OCR provider failed, recording no result");
                Vec::new()
            }
        };

        record_ocr(frame_number);
        on_result(OcrResult { frame_number, entries });
        queue.return_producer(buffer);
    }
}

/// Trim each entry's text and drop any whose trimmed length falls below
/// `min_letters`, preserving the provider's original order.
fn filter_entries(raw: Vec<TextEntry>, min_letters: usize) -> Vec<TextEntry> {
    raw.into_iter()
        .filter_map(|mut entry| {
            let trimmed = entry.text.trim();
            if trimmed.chars().count() < min_letters {
                return None;
            }
            if trimmed.len() != entry.text.len() {
                entry.text = trimmed.to_string();
            }
            Some(entry)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use frametrace_queue::FrameQueue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubProvider {
        entries: Vec<TextEntry>,
    }

    impl OcrProvider for StubProvider {
        fn do_ocr(&self, _rgb: &[u8], _w: u32, _h: u32, _bpl: usize) -> Result<Vec<TextEntry>, OcrError> {
            Ok(self.entries.clone())
        }
    }

    fn entry(text: &str) -> TextEntry {
        TextEntry { left: 0, top: 0, right: 10, bottom: 10, confidence: 90.0, text: text.to_string() }
    }

    #[test]
    fn drops_short_entries_and_trims_whitespace() {
        let filtered = filter_entries(
            vec![entry("  hi "), entry(" hello "), entry("ok")],
            3,
        );
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].text, "hello");
    }

    #[test]
    fn skipped_frames_never_reach_the_provider() {
        let queue = FrameQueue::new(1, 4, 4, 12);
        let buf = queue.take_producer().unwrap();
        queue.return_consumer(buf);

        let provider = StubProvider { entries: vec![entry("should-not-be-seen")] };
        let skips = Mutex::new(Vec::new());
        let results = AtomicUsize::new(0);

        queue.shutdown();
        run(
            &queue,
            &provider,
            |_| true,
            |n| skips.lock().unwrap().push(n),
            |_| panic!("record_ocr should not be called for a skipped frame"),
            |_| {
                results.fetch_add(1, Ordering::SeqCst);
            },
        );

        // The buffer was never `.fill()`ed, so it still carries `FrameBuffer::new`'s
        // default frame number, and the skip branch never calls `on_result`.
        assert_eq!(*skips.lock().unwrap(), vec![-1]);
        assert_eq!(results.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn processed_frames_produce_a_filtered_result() {
        let queue = FrameQueue::new(1, 4, 4, 12);
        let buf = queue.take_producer().unwrap();
        queue.return_consumer(buf);
        queue.shutdown();

        let provider = StubProvider { entries: vec![entry("hello"), entry("no")] };
        let mut captured = None;

        run(
            &queue,
            &provider,
            |_| false,
            |_| panic!("record_skip should not be called"),
            |_| {},
            |result| captured = Some(result),
        );

        let result = captured.expect("a result should have been recorded");
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].text, "hello");
    }
}
