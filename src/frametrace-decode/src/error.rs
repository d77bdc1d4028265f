use thiserror::Error;

/// Failures raised by the video decoder.
///
/// Variants marked "fatal" propagate to the orchestrator and abort the run;
/// everything else is absorbed inside the decoder per the component's
/// failure semantics (hardware fallback, per-packet skip).
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to open container {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: ffmpeg_next::Error,
    },

    #[error("no video stream found in {0}")]
    NoVideoStream(String),

    #[error("failed to open codec: {0}")]
    CodecOpen(#[source] ffmpeg_next::Error),

    #[error("failed to build colour-conversion scaler: {0}")]
    Scaler(#[source] ffmpeg_next::Error),

    #[error("seek failed: {0}")]
    Seek(#[source] ffmpeg_next::Error),

    #[error("ffmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),
}
