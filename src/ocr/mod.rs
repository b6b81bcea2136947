//! Price recognition.
//!
//! Captured price regions are binarized, read by Tesseract as a single line,
//! and the highest-confidence numeric word is returned.

pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

use anyhow::Result;
use image::RgbaImage;
use tracing::debug;

pub use extract::{best_price, parse_price};
pub use setup::{ensure_tesseract, TesseractPaths};

/// Decodes a number from a captured region.
pub trait NumberReader: Send + Sync {
    /// Returns `Ok(None)` when the region holds no numeric candidate.
    fn read(&self, image: &RgbaImage) -> Result<Option<f64>>;
}

/// `NumberReader` backed by the Tesseract CLI.
pub struct TesseractReader {
    paths: TesseractPaths,
}

impl TesseractReader {
    /// Locates Tesseract, provisioning trained data if needed.
    pub fn new() -> Result<Self> {
        Ok(Self::with_paths(ensure_tesseract()?))
    }

    pub fn with_paths(paths: TesseractPaths) -> Self {
        Self { paths }
    }
}

impl NumberReader for TesseractReader {
    fn read(&self, image: &RgbaImage) -> Result<Option<f64>> {
        let binary = preprocess::binarize_for_ocr(image);
        let lines = engine::recognize_line(&binary, &self.paths.executable, &self.paths.tessdata)?;
        debug!(
            "OCR raw lines: {:?}",
            lines.iter().map(|l| l.text.as_str()).collect::<Vec<_>>()
        );
        Ok(best_price(&lines))
    }
}
