//! OCR via Tesseract, through the `leptess` bindings.
//!
//! The cross-platform counterpart to [`crate::windows_provider`]: same
//! `OcrProvider` seam, different engine underneath. `leptess` takes an
//! encoded image rather than a raw pixel buffer, so the RGB24 frame is PNG
//! encoded first, same as the Windows provider does for `SoftwareBitmap`.

use std::sync::Mutex;

use image::{ColorType, ImageEncoder};
use leptess::{capi::TessPageIteratorLevel_RIL_WORD, LepTess};

use crate::error::OcrError;
use crate::provider::OcrProvider;
use crate::types::TextEntry;

/// Wraps a `LepTess` instance behind a mutex: the underlying Tesseract API
/// instance is not `Sync`, but the worker loop calls `do_ocr` from whichever
/// thread owns this provider, so one instance per provider handle is shared
/// under a lock rather than recreated per call.
pub struct TesseractProvider {
    engine: Mutex<LepTess>,
}

impl TesseractProvider {
    pub fn new(language: &str) -> Result<Self, OcrError> {
        let engine = LepTess::new(None, language)
            .map_err(|e| OcrError::EngineInit(format!("failed to initialize tesseract for '{}': {}", language, e)))?;
        Ok(Self { engine: Mutex::new(engine) })
    }

    pub fn english() -> Result<Self, OcrError> {
        Self::new("eng")
    }

    fn rgb24_to_png(rgb: &[u8], width: u32, height: u32, bytes_per_line: usize) -> Result<Vec<u8>, OcrError> {
        let expected_len = bytes_per_line * height as usize;
        if rgb.len() < expected_len {
            return Err(OcrError::Conversion(format!(
                "buffer too small: got {} bytes, expected at least {}",
                rgb.len(),
                expected_len
            )));
        }

        let tight_stride = width as usize * 3;
        let mut packed = Vec::with_capacity(tight_stride * height as usize);
        for row in rgb.chunks(bytes_per_line).take(height as usize) {
            packed.extend_from_slice(&row[..tight_stride]);
        }

        let mut png = Vec::new();
        image::codecs::png::PngEncoder::new(&mut png)
            .write_image(&packed, width, height, ColorType::Rgb8.into())
            .map_err(OcrError::Image)?;
        Ok(png)
    }
}

impl OcrProvider for TesseractProvider {
    fn do_ocr(&self, rgb: &[u8], width: u32, height: u32, bytes_per_line: usize) -> Result<Vec<TextEntry>, OcrError> {
        let png = Self::rgb24_to_png(rgb, width, height, bytes_per_line)?;

        let mut engine = self.engine.lock().unwrap();
        engine
            .set_image_from_mem(&png)
            .map_err(|e| OcrError::Processing(format!("failed to load frame into tesseract: {}", e)))?;

        let boxes = engine
            .get_component_boxes(TessPageIteratorLevel_RIL_WORD, false)
            .map_err(|e| OcrError::Processing(format!("failed to enumerate word boxes: {}", e)))?;

        let mut entries = Vec::with_capacity(boxes.len());
        for b in boxes {
            engine.set_rectangle(&b);
            let text = match engine.get_utf8_text() {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!(error = %e, "tesseract failed to recognize a word box, skipping");
                    continue;
                }
            };
            let confidence = engine.mean_text_conf() as f32;

            entries.push(TextEntry {
                left: b.x,
                top: b.y,
                right: b.x + b.w,
                bottom: b.y + b.h,
                confidence,
                text,
            });
        }

        Ok(entries)
    }
}
