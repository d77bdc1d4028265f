//! Thread-safe processing-rate aggregator.
//!
//! Workers report every OCR'd or skipped frame; every 5 seconds of wall time
//! the meter emits a [`Progress`] snapshot to its callback and resets its
//! internal counters.

use std::sync::Mutex;
use std::time::{Duration, Instant};

const REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// A single rate report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Frames actually OCR'd per second since the last report.
    pub recognized_fps: f64,
    /// Frames seen (OCR'd or skipped) per second since the last report —
    /// i.e. the overall seek/advance rate.
    pub total_fps: f64,
    /// Highest frame number observed so far.
    pub last_frame_number: i64,
}

struct State {
    last_report_time: Instant,
    frames_processed: u64,
    last_frame_number: i64,
    last_report_frame_number: i64,
}

/// Aggregates frame-processing speed across all OCR worker threads.
///
/// `starting_frame_num` seeds the baseline for the first report's `total_fps`
/// so the rate computed right after resume reflects frames processed since
/// the run started, not since frame 0.
pub struct SpeedMeter<F: Fn(Progress) + Send + Sync> {
    state: Mutex<State>,
    callback: F,
}

impl<F: Fn(Progress) + Send + Sync> SpeedMeter<F> {
    pub fn new(starting_frame_num: i64, callback: F) -> Self {
        Self {
            state: Mutex::new(State {
                last_report_time: Instant::now(),
                frames_processed: 0,
                last_frame_number: 0,
                last_report_frame_number: starting_frame_num,
            }),
            callback,
        }
    }

    /// Record a frame that was actually OCR'd.
    pub fn record_ocr(&self, frame_num: i64) {
        let mut state = self.state.lock().unwrap();
        state.last_frame_number = state.last_frame_number.max(frame_num);
        state.frames_processed += 1;
        self.check_progress(&mut state);
    }

    /// Record a frame that was skipped (already processed, per the store).
    pub fn record_skip(&self, frame_num: i64) {
        let mut state = self.state.lock().unwrap();
        state.last_frame_number = state.last_frame_number.max(frame_num);
        self.check_progress(&mut state);
    }

    fn check_progress(&self, state: &mut State) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_report_time);
        if elapsed < REPORT_INTERVAL {
            return;
        }

        let elapsed_secs = elapsed.as_secs_f64();
        let frames_seeked = state.last_frame_number - state.last_report_frame_number;

        let report = Progress {
            recognized_fps: state.frames_processed as f64 / elapsed_secs,
            total_fps: frames_seeked as f64 / elapsed_secs,
            last_frame_number: state.last_frame_number,
        };
        (self.callback)(report);

        state.last_report_frame_number = state.last_frame_number;
        state.last_report_time = now;
        state.frames_processed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn tracks_max_frame_number_across_ocr_and_skip() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let meter = SpeedMeter::new(0, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        meter.record_ocr(5);
        meter.record_skip(10);
        meter.record_ocr(3);

        let state = meter.state.lock().unwrap();
        assert_eq!(state.last_frame_number, 10);
        assert_eq!(state.frames_processed, 2);
    }

    #[test]
    fn does_not_report_before_interval_elapses() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let meter = SpeedMeter::new(0, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        for i in 0..100 {
            meter.record_ocr(i);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
