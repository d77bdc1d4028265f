//! Top-level error handling.
//!
//! Each component crate defines its own `thiserror`-derived leaf error enum
//! (`frametrace_decode::DecodeError`, `frametrace_ocr::OcrError`,
//! `frametrace_db::DatabaseError`). This binary composes them behind
//! `anyhow::Result` rather than re-wrapping them in a fourth enum — there is
//! nothing this layer needs to match on, only to log and propagate.

pub use anyhow::{Context, Result};
