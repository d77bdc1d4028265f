use crate::error::OcrError;
use crate::types::TextEntry;

/// A capability that turns a decoded RGB24 frame into recognized text.
///
/// Implementations are free to return entries in whatever order their
/// underlying engine produces them, untrimmed and of any length — the
/// worker loop trims and filters before building the final [`crate::OcrResult`].
pub trait OcrProvider {
    /// Minimum trimmed-text length for an entry to survive; shorter entries
    /// are discarded by the worker. Every provider observed so far agrees on
    /// 3, but it's a provider-level knob, not a pipeline-wide constant.
    const MIN_LETTERS_THRESHOLD: usize = 3;

    fn do_ocr(
        &self,
        rgb: &[u8],
        width: u32,
        height: u32,
        bytes_per_line: usize,
    ) -> Result<Vec<TextEntry>, OcrError>;
}
