//! Frametrace Core Library
//!
//! Wires together decoding, OCR, and the result store into the end-to-end
//! pipeline, plus the CLI-facing configuration and logging setup.

pub mod colored_logger;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod provider;
