//! OCR via `Windows.Media.Ocr`.
//!
//! Windows OCR doesn't expose the async machinery over a convenient sync
//! API, but every operation it returns (`IAsyncOperation<T>`) can be waited
//! on synchronously with `.get()` — which is exactly what a blocking worker
//! thread wants, so no runtime is pulled in here.

use windows::{
    Globalization::Language,
    Graphics::Imaging::BitmapDecoder,
    Media::Ocr::OcrEngine,
    Storage::Streams::{DataWriter, InMemoryRandomAccessStream},
};

use crate::error::OcrError;
use crate::provider::OcrProvider;
use crate::types::TextEntry;

pub struct WindowsOcrProvider {
    engine: OcrEngine,
}

impl WindowsOcrProvider {
    pub fn new(language_tag: Option<&str>) -> Result<Self, OcrError> {
        let engine = if let Some(tag) = language_tag {
            let lang = Language::CreateLanguage(&tag.into())
                .map_err(|e| OcrError::EngineInit(format!("invalid language tag '{}': {}", tag, e)))?;
            OcrEngine::TryCreateFromLanguage(&lang)
                .map_err(|e| OcrError::EngineInit(format!("no OCR engine for '{}': {}", tag, e)))?
        } else {
            OcrEngine::TryCreateFromUserProfileLanguages()
                .map_err(|e| OcrError::EngineInit(format!("no OCR engine for user profile: {}", e)))?
        };
        Ok(Self { engine })
    }

    pub fn english() -> Result<Self, OcrError> {
        Self::new(Some("en-US"))
    }

    fn rgb24_to_bitmap(
        &self,
        rgb: &[u8],
        width: u32,
        height: u32,
        bytes_per_line: usize,
    ) -> Result<windows::Graphics::Imaging::SoftwareBitmap, OcrError> {
        let expected_row = width as usize * 3;
        if bytes_per_line < expected_row || rgb.len() < bytes_per_line * height as usize {
            return Err(OcrError::Conversion(format!(
                "frame buffer too small for {}x{} RGB24 (bytes_per_line={})",
                width, height, bytes_per_line
            )));
        }

        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for row in 0..height as usize {
            let start = row * bytes_per_line;
            for px in rgb[start..start + expected_row].chunks_exact(3) {
                rgba.push(px[0]);
                rgba.push(px[1]);
                rgba.push(px[2]);
                rgba.push(255);
            }
        }

        let img = image::ImageBuffer::<image::Rgba<u8>, Vec<u8>>::from_raw(width, height, rgba)
            .ok_or_else(|| OcrError::Conversion("failed to build image buffer".to_string()))?;

        let mut png = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)?;

        let stream = InMemoryRandomAccessStream::new()
            .map_err(|e| OcrError::Conversion(format!("failed to create stream: {}", e)))?;
        let writer = DataWriter::CreateDataWriter(&stream)
            .map_err(|e| OcrError::Conversion(format!("failed to create writer: {}", e)))?;
        writer
            .WriteBytes(&png)
            .map_err(|e| OcrError::Conversion(format!("failed to write bytes: {}", e)))?;
        writer
            .StoreAsync()
            .map_err(|e| OcrError::Conversion(format!("failed to store: {}", e)))?
            .get()
            .map_err(|e| OcrError::Conversion(format!("failed to flush writer: {}", e)))?;
        stream
            .Seek(0)
            .map_err(|e| OcrError::Conversion(format!("failed to rewind stream: {}", e)))?;

        let decoder = BitmapDecoder::CreateAsync(&stream)
            .map_err(|e| OcrError::Conversion(format!("failed to create decoder: {}", e)))?
            .get()
            .map_err(|e| OcrError::Conversion(format!("failed to run decoder: {}", e)))?;

        decoder
            .GetSoftwareBitmapAsync()
            .map_err(|e| OcrError::Conversion(format!("failed to request bitmap: {}", e)))?
            .get()
            .map_err(|e| OcrError::Conversion(format!("failed to decode bitmap: {}", e)))
    }

    /// Windows OCR doesn't report per-word confidence; approximate one from
    /// the word's own text so results remain comparable across frames.
    fn estimate_confidence(text: &str) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let mut score = 0.7;
        score += (text.len() as f32 / 20.0).min(0.15);

        let has_lower = text.chars().any(|c| c.is_lowercase());
        let has_upper = text.chars().any(|c| c.is_uppercase());
        let has_digit = text.chars().any(|c| c.is_numeric());
        if has_lower && has_upper {
            score += 0.05;
        }
        if has_digit && (has_lower || has_upper) {
            score += 0.05;
        }
        if text.chars().all(|c| c.is_uppercase() || !c.is_alphabetic()) {
            score -= 0.1;
        }
        if text.chars().all(|c| c.is_numeric()) {
            score -= 0.15;
        }
        score.clamp(0.0, 1.0) * 100.0
    }
}

impl OcrProvider for WindowsOcrProvider {
    fn do_ocr(
        &self,
        rgb: &[u8],
        width: u32,
        height: u32,
        bytes_per_line: usize,
    ) -> Result<Vec<TextEntry>, OcrError> {
        let bitmap = self.rgb24_to_bitmap(rgb, width, height, bytes_per_line)?;

        let result = self
            .engine
            .RecognizeAsync(&bitmap)
            .map_err(|e| OcrError::Processing(format!("failed to start OCR: {}", e)))?
            .get()
            .map_err(|e| OcrError::Processing(format!("OCR recognition failed: {}", e)))?;

        let mut entries = Vec::new();
        let lines = result
            .Lines()
            .map_err(|e| OcrError::Processing(format!("failed to read OCR lines: {}", e)))?;
        for i in 0..lines.Size()? {
            let line = lines.GetAt(i)?;
            let words = line.Words()?;
            for j in 0..words.Size()? {
                let word = words.GetAt(j)?;
                let text = word.Text()?.to_string();
                let bbox = word.BoundingRect()?;
                let confidence = Self::estimate_confidence(&text);
                entries.push(TextEntry {
                    left: bbox.X.round() as i32,
                    top: bbox.Y.round() as i32,
                    right: (bbox.X + bbox.Width).round() as i32,
                    bottom: (bbox.Y + bbox.Height).round() as i32,
                    confidence,
                    text,
                });
            }
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_rewards_length_and_mixed_case() {
        assert!(WindowsOcrProvider::estimate_confidence("Hello") > 70.0);
        assert!(WindowsOcrProvider::estimate_confidence("HelloWorld123") > 80.0);
        assert!(WindowsOcrProvider::estimate_confidence("ALLCAPS") < 70.0);
        assert!(WindowsOcrProvider::estimate_confidence("12345") < 60.0);
        assert_eq!(WindowsOcrProvider::estimate_confidence(""), 0.0);
    }
}
