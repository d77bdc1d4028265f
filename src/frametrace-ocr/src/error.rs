use thiserror::Error;

/// OCR provider failures. Per-frame failures are absorbed by the worker (the
/// frame is treated as a no-result and the buffer is still recycled) —
/// nothing here propagates to the orchestrator.
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("failed to initialize OCR engine: {0}")]
    EngineInit(String),

    #[error("frame conversion error: {0}")]
    Conversion(String),

    #[error("OCR processing error: {0}")]
    Processing(String),

    #[cfg(feature = "windows-ocr")]
    #[error("windows API error: {0}")]
    Windows(#[from] windows::core::Error),

    #[cfg(any(feature = "windows-ocr", feature = "tesseract-ocr"))]
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, OcrError>;
