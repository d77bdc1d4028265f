//! Configuration management

use std::path::PathBuf;
use std::thread::available_parallelism;

use frametrace_decode::FrameFilter;
use serde::{Deserialize, Serialize};

/// Pipeline configuration. Loaded from an optional TOML file (`--config`),
/// with individual CLI flags overriding whatever the file set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Input video file to decode.
    pub video_file: PathBuf,

    /// SQLite store to read/write recognized text and progress into.
    pub database_file: PathBuf,

    /// Number of OCR worker threads.
    pub worker_count: usize,

    /// Which picture types to hand to OCR. Serialized as the bitmask's byte.
    #[serde(default = "default_frame_filter_bits", with = "frame_filter_bits")]
    pub frame_filter: FrameFilter,

    /// BCP-47 language tag for the OCR provider, where the active provider
    /// takes one.
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,
}

fn default_frame_filter_bits() -> FrameFilter {
    FrameFilter::default()
}

fn default_ocr_language() -> String {
    "en-US".to_string()
}

mod frame_filter_bits {
    use frametrace_decode::FrameFilter;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(filter: &FrameFilter, s: S) -> Result<S::Ok, S::Error> {
        filter.bits().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<FrameFilter, D::Error> {
        Ok(FrameFilter::from_bits(u8::deserialize(d)?))
    }
}

/// Worker count the pipeline falls back to when neither the config file nor
/// the CLI specify one: all available cores minus one, reserving a core for
/// the decoder thread, floored at 1.
pub fn default_worker_count() -> usize {
    available_parallelism().map(|n| n.get()).unwrap_or(2).saturating_sub(1).max(1)
}

impl Config {
    pub fn load_from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text)?;
        Ok(config)
    }
}
