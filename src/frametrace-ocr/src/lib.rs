//! OCR worker: drains decoded frames from a [`frametrace_queue::FrameQueue`],
//! skips already-processed ones, and runs the rest through an [`OcrProvider`].
//!
//! The concrete recognition engine is a collaborator, not part of this
//! crate's contract — [`OcrProvider`] is the seam. `windows_provider` behind
//! the `windows-ocr` feature is one implementation; `test_provider` offers
//! deterministic stand-ins for testing the rest of the pipeline.

mod error;
mod provider;
#[cfg(any(test, feature = "test-providers"))]
mod test_provider;
#[cfg(feature = "tesseract-ocr")]
mod tesseract_provider;
mod types;
mod worker;
#[cfg(all(feature = "windows-ocr", windows))]
mod windows_provider;

pub use error::{OcrError, Result};
pub use provider::OcrProvider;
#[cfg(any(test, feature = "test-providers"))]
pub use test_provider::{FixedProvider, NullProvider};
#[cfg(feature = "tesseract-ocr")]
pub use tesseract_provider::TesseractProvider;
pub use types::{OcrResult, TextEntry};
pub use worker::run;
#[cfg(all(feature = "windows-ocr", windows))]
pub use windows_provider::WindowsOcrProvider;
