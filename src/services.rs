//! Platform services shared by every controller.

use anyhow::Result;
use std::sync::Arc;

use crate::capture::ScreenSampler;
use crate::input::InputDriver;
use crate::ocr::NumberReader;

/// Screen, OCR and input backends, constructed once at startup.
#[derive(Clone)]
pub struct Services {
    pub sampler: Arc<dyn ScreenSampler>,
    pub reader: Arc<dyn NumberReader>,
    pub input: Arc<dyn InputDriver>,
}

impl Services {
    pub fn new(
        sampler: Arc<dyn ScreenSampler>,
        reader: Arc<dyn NumberReader>,
        input: Arc<dyn InputDriver>,
    ) -> Self {
        Self {
            sampler,
            reader,
            input,
        }
    }

    /// GDI capture, Tesseract OCR and `SendInput` injection.
    ///
    /// Fails if any backend cannot initialize.
    #[cfg(windows)]
    pub fn platform() -> Result<Self> {
        use anyhow::Context;

        let sampler = crate::capture::GdiSampler::new().context("Screen capture unavailable")?;
        let reader = crate::ocr::TesseractReader::new().context("OCR engine unavailable")?;
        let input =
            crate::input::sendinput::SendInputDriver::new().context("Input driver unavailable")?;
        Ok(Self::new(Arc::new(sampler), Arc::new(reader), Arc::new(input)))
    }

    #[cfg(not(windows))]
    pub fn platform() -> Result<Self> {
        anyhow::bail!("Screen capture and input drivers are only available on Windows")
    }
}
