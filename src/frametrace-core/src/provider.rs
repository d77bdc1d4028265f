//! Selects which `OcrProvider` implementation this binary is built with.
//!
//! `OcrProvider` carries an associated const, so it is not object-safe — the
//! active provider is a compile-time type alias rather than a `Box<dyn _>`,
//! picked by feature flag instead of at runtime.

#[cfg(all(feature = "windows-ocr", windows))]
pub type ActiveProvider = frametrace_ocr::WindowsOcrProvider;

#[cfg(not(all(feature = "windows-ocr", windows)))]
pub type ActiveProvider = frametrace_ocr::TesseractProvider;

#[cfg(all(feature = "windows-ocr", windows))]
pub fn build(language: &str) -> anyhow::Result<ActiveProvider> {
    frametrace_ocr::WindowsOcrProvider::new(Some(language)).map_err(Into::into)
}

#[cfg(not(all(feature = "windows-ocr", windows)))]
pub fn build(language: &str) -> anyhow::Result<ActiveProvider> {
    frametrace_ocr::TesseractProvider::new(language).map_err(Into::into)
}
