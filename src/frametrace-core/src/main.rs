//! Frametrace — video OCR ingestion pipeline CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

use frametrace_core::colored_logger;
use frametrace_core::config::{default_worker_count, Config};
use frametrace_core::pipeline;
use frametrace_decode::FrameFilter;
use frametrace_db::Database;

#[derive(Parser)]
#[command(name = "frametrace")]
#[command(about = "Decode a video, OCR its frames, and store recognized text")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the decode + OCR pipeline to completion (or until interrupted)
    Run {
        /// Input video file
        #[arg(short = 'i', long)]
        video_file: Option<PathBuf>,

        /// SQLite store to read/write
        #[arg(short, long)]
        database_file: Option<PathBuf>,

        /// Number of OCR worker threads
        #[arg(short, long)]
        workers: Option<usize>,

        /// Picture types to OCR, any combination of I/P/B (e.g. "IP")
        #[arg(long)]
        frame_filter: Option<String>,

        /// OCR language tag (e.g. "en-US" for Windows OCR, "eng" for Tesseract)
        #[arg(long)]
        language: Option<String>,
    },

    /// Print store statistics: schema version, progress pointer, row counts
    Status {
        #[arg(short, long)]
        database_file: PathBuf,
    },

    /// Print recognized text instances containing a substring
    Search {
        substring: String,

        #[arg(short, long)]
        database_file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    colored_logger::init_component_logger(level)?;

    match cli.command {
        Commands::Run { video_file, database_file, workers, frame_filter, language } => {
            let config = resolve_run_config(cli.config.as_deref(), video_file, database_file, workers, frame_filter, language)?;
            let status = pipeline::run(&config)?;
            std::process::exit(status.exit_code());
        }
        Commands::Status { database_file } => {
            let db = Database::open(&database_file)?;
            pipeline::print_status(&db)?;
        }
        Commands::Search { substring, database_file } => {
            let db = Database::open(&database_file)?;
            pipeline::print_search(&db, &substring)?;
        }
    }

    Ok(())
}

fn resolve_run_config(
    config_path: Option<&std::path::Path>,
    video_file: Option<PathBuf>,
    database_file: Option<PathBuf>,
    workers: Option<usize>,
    frame_filter: Option<String>,
    language: Option<String>,
) -> Result<Config> {
    let mut config = match config_path {
        Some(path) => Config::load_from_file(path)?,
        None => Config {
            video_file: video_file.clone().ok_or_else(|| anyhow::anyhow!("--video-file is required without --config"))?,
            database_file: database_file
                .clone()
                .ok_or_else(|| anyhow::anyhow!("--database-file is required without --config"))?,
            worker_count: default_worker_count(),
            frame_filter: FrameFilter::default(),
            ocr_language: "en-US".to_string(),
        },
    };

    if let Some(video_file) = video_file {
        config.video_file = video_file;
    }
    if let Some(database_file) = database_file {
        config.database_file = database_file;
    }
    if let Some(workers) = workers {
        config.worker_count = workers.max(1);
    }
    if let Some(frame_filter) = frame_filter {
        config.frame_filter = FrameFilter::parse(&frame_filter);
    }
    if let Some(language) = language {
        config.ocr_language = language;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_are_required_without_a_config_file() {
        let err = resolve_run_config(None, None, None, None, None, None).unwrap_err();
        assert!(err.to_string().contains("--video-file"));
    }

    #[test]
    fn cli_flags_fill_in_all_fields_without_a_config_file() {
        let config = resolve_run_config(
            None,
            Some(PathBuf::from("in.mkv")),
            Some(PathBuf::from("out.db")),
            Some(4),
            Some("ip".to_string()),
            Some("eng".to_string()),
        )
        .unwrap();

        assert_eq!(config.video_file, PathBuf::from("in.mkv"));
        assert_eq!(config.database_file, PathBuf::from("out.db"));
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.frame_filter, FrameFilter::parse("ip"));
        assert_eq!(config.ocr_language, "eng");
    }

    #[test]
    fn a_zero_worker_override_is_floored_to_one() {
        let config = resolve_run_config(
            None,
            Some(PathBuf::from("in.mkv")),
            Some(PathBuf::from("out.db")),
            Some(0),
            None,
            None,
        )
        .unwrap();
        assert_eq!(config.worker_count, 1);
    }
}
