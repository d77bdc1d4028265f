//! Wires the decoder, OCR workers, and the result store into the end-to-end
//! run. Mirrors the nine-step responsibility list this workspace's prior
//! `orchestrator` module followed, narrowed to this pipeline's shape: open
//! store, build queue, build decoder, spawn workers, install signal
//! handling, drive the decoder, shut down, join, report.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use frametrace_db::Database;
use frametrace_decode::Decoder;
use frametrace_meter::{Progress, SpeedMeter};
use frametrace_queue::FrameQueue;

use crate::config::Config;
use crate::error::Result;
use crate::provider;

/// How the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Interrupted,
    Errored,
}

impl RunStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Completed => 0,
            RunStatus::Interrupted | RunStatus::Errored => 1,
        }
    }
}

pub fn run(config: &Config) -> Result<RunStatus> {
    let db = Arc::new(Database::open(&config.database_file)?);
    let starting_frame = db.starting_frame()?;
    tracing::info!(target: "pipeline", starting_frame, "resuming from store progress pointer");

    let video_path = config
        .video_file
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("video path is not valid UTF-8: {:?}", config.video_file))?;

    let mut decoder = Decoder::open(video_path, config.frame_filter, starting_frame)?;
    let estimated_total = decoder.estimated_frame_count();
    tracing::info!(target: "pipeline", ?estimated_total, "decoder opened");

    let queue = Arc::new(FrameQueue::new(
        2 * config.worker_count,
        decoder.width(),
        decoder.height(),
        decoder.bytes_per_line(),
    ));

    let interrupted = Arc::new(AtomicBool::new(false));
    let errored = Arc::new(AtomicBool::new(false));

    let meter = Arc::new(SpeedMeter::new(starting_frame, |progress: Progress| {
        tracing::info!(
            target: "pipeline",
            recognized_fps = progress.recognized_fps,
            total_fps = progress.total_fps,
            last_frame_number = progress.last_frame_number,
            "progress"
        );
    }));

    let mut workers = Vec::with_capacity(config.worker_count);
    for worker_id in 0..config.worker_count {
        let queue = Arc::clone(&queue);
        let db = Arc::clone(&db);
        let meter = Arc::clone(&meter);
        let errored = Arc::clone(&errored);
        let language = config.ocr_language.clone();

        workers.push(
            thread::Builder::new()
                .name(format!("ocr-worker-{worker_id}"))
                .spawn(move || {
                    deprioritize_current_thread();

                    let provider = match provider::build(&language) {
                        Ok(provider) => provider,
                        Err(e) => {
                            tracing::error!(target: "ocr", worker_id, error = %e, "failed to initialize OCR provider");
                            errored.store(true, Ordering::Relaxed);
                            queue.shutdown();
                            return;
                        }
                    };

                    frametrace_ocr::run(
                        &queue,
                        &provider,
                        |frame_number| db.is_frame_processed(frame_number).unwrap_or(false),
                        |frame_number| meter.record_skip(frame_number),
                        |frame_number| meter.record_ocr(frame_number),
                        |result| {
                            if let Err(e) = db.store(&result) {
                                tracing::error!(target: "store", error = %e, "failed to persist OCR result, aborting run");
                                errored.store(true, Ordering::Relaxed);
                                queue.shutdown();
                            }
                        },
                    );
                })
                .expect("failed to spawn OCR worker thread"),
        );
    }

    install_signal_handler(Arc::clone(&queue), Arc::clone(&interrupted))?;

    let should_stop = {
        let interrupted = Arc::clone(&interrupted);
        move || interrupted.load(Ordering::Relaxed)
    };

    if let Err(e) = decoder.run(&queue, starting_frame, should_stop) {
        tracing::error!(target: "decode", error = %e, "decoder aborted");
        errored.store(true, Ordering::Relaxed);
    }
    queue.shutdown();

    for worker in workers {
        if worker.join().is_err() {
            tracing::error!(target: "pipeline", "an OCR worker thread panicked");
            errored.store(true, Ordering::Relaxed);
        }
    }

    let status = if interrupted.load(Ordering::Relaxed) {
        RunStatus::Interrupted
    } else if errored.load(Ordering::Relaxed) {
        RunStatus::Errored
    } else {
        RunStatus::Completed
    };

    tracing::info!(target: "pipeline", ?status, "run finished");
    Ok(status)
}

fn install_signal_handler(queue: Arc<FrameQueue>, interrupted: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        tracing::warn!(target: "pipeline", "received shutdown signal");
        interrupted.store(true, Ordering::Relaxed);
        queue.shutdown();
    })
    .map_err(|e| anyhow::anyhow!("failed to install signal handler: {e}"))?;
    Ok(())
}

/// Best-effort: lower this OCR worker's scheduling priority so the decoder
/// thread stays responsive. No-op on platforms without a `nice()`-like call.
#[cfg(unix)]
fn deprioritize_current_thread() {
    unsafe {
        let _ = libc::nice(19);
    }
}

#[cfg(not(unix))]
fn deprioritize_current_thread() {}

pub fn print_status(db: &Database) -> Result<()> {
    let stats = db.stats()?;
    println!("schema version:       {}", stats.schema_version);
    println!("last processed frame: {}", stats.last_processed_frame);
    println!("text instances:       {}", stats.text_instance_count);
    println!("distinct text values: {}", stats.distinct_text_count);
    Ok(())
}

pub fn print_search(db: &Database, substring: &str) -> Result<()> {
    let pattern = format!("%{substring}%");
    let hits = db.find_text(&pattern)?;
    if hits.is_empty() {
        println!("no matches for {substring:?}");
        return Ok(());
    }
    for hit in hits {
        println!(
            "frame {:>8}  [{:>4},{:>4},{:>4},{:>4}]  conf {:>5.1}  {}",
            hit.frame_number, hit.left, hit.top, hit.right, hit.bottom, hit.confidence, hit.text
        );
    }
    Ok(())
}
