use crate::error::OcrError;
use crate::provider::OcrProvider;
use crate::types::TextEntry;

/// A provider that never finds text. Useful for exercising the pipeline's
/// plumbing (queue draining, progress, shutdown) without a real OCR engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProvider;

impl OcrProvider for NullProvider {
    fn do_ocr(&self, _rgb: &[u8], _width: u32, _height: u32, _bytes_per_line: usize) -> Result<Vec<TextEntry>, OcrError> {
        Ok(Vec::new())
    }
}

/// A provider that returns the same canned entries for every frame,
/// regardless of pixel content. Deterministic stand-in for integration tests
/// that need to assert on store contents.
#[derive(Debug, Clone, Default)]
pub struct FixedProvider {
    pub entries: Vec<TextEntry>,
}

impl FixedProvider {
    pub fn new(entries: Vec<TextEntry>) -> Self {
        Self { entries }
    }
}

impl OcrProvider for FixedProvider {
    fn do_ocr(&self, _rgb: &[u8], _width: u32, _height: u32, _bytes_per_line: usize) -> Result<Vec<TextEntry>, OcrError> {
        Ok(self.entries.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_provider_finds_nothing() {
        let provider = NullProvider;
        let entries = provider.do_ocr(&[0; 12], 2, 2, 6).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn fixed_provider_returns_the_same_entries_every_time() {
        let entry = TextEntry { left: 0, top: 0, right: 5, bottom: 5, confidence: 95.0, text: "hello".into() };
        let provider = FixedProvider::new(vec![entry.clone()]);
        assert_eq!(provider.do_ocr(&[], 0, 0, 0).unwrap(), vec![entry.clone()]);
        assert_eq!(provider.do_ocr(&[1, 2, 3], 1, 1, 3).unwrap(), vec![entry]);
    }
}
