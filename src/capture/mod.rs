//! Screen sampling.
//!
//! This module provides:
//! - The `ScreenSampler` seam used by the controllers
//! - A GDI implementation for the primary screen (`GdiSampler`, Windows only)

#[cfg(windows)]
pub mod gdi;

use anyhow::{anyhow, Result};
use image::RgbaImage;

use crate::session::{Color, Coordinate, Region};

#[cfg(windows)]
pub use gdi::GdiSampler;

/// Reads pixels from the capture surface.
///
/// Implementations are shared across watch threads; each call completes one
/// capture before returning.
pub trait ScreenSampler: Send + Sync {
    fn capture(&self, region: Region) -> Result<RgbaImage>;

    /// Color of the single pixel at `at`.
    fn pixel_color(&self, at: Coordinate) -> Result<Color> {
        let region = Region::around_with_size(at, 1, 1);
        let img = self.capture(region)?;
        let pixel = img
            .get_pixel_checked(0, 0)
            .ok_or_else(|| anyhow!("Empty capture at {}", at))?;
        Ok(Color::new(pixel[0], pixel[1], pixel[2]))
    }
}
