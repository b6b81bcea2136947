//! Primary-screen capture with GDI `BitBlt`.

use anyhow::{anyhow, Result};
use image::{ImageBuffer, Rgba, RgbaImage};
use tracing::{debug, info};

use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, SRCCOPY,
};

use super::ScreenSampler;
use crate::session::{Coordinate, Region};

/// Captures regions of the desktop through the screen DC.
pub struct GdiSampler;

impl GdiSampler {
    /// Opens the sampler and verifies the screen DC can be read.
    pub fn new() -> Result<Self> {
        let sampler = Self;
        sampler
            .capture(Region::around_with_size(Coordinate::new(0, 0), 1, 1))
            .map_err(|e| anyhow!("Screen capture unavailable: {}", e))?;
        info!("GDI screen sampler ready");
        Ok(sampler)
    }
}

impl ScreenSampler for GdiSampler {
    fn capture(&self, region: Region) -> Result<RgbaImage> {
        let width = region.width() as i32;
        let height = region.height() as i32;

        let mut bgra = vec![0u8; region.width() as usize * region.height() as usize * 4];

        unsafe {
            let screen_dc = GetDC(HWND::default());
            if screen_dc.0.is_null() {
                return Err(anyhow!("GetDC failed"));
            }

            let mem_dc = CreateCompatibleDC(screen_dc);
            let bitmap = CreateCompatibleBitmap(screen_dc, width, height);
            let old_bitmap = SelectObject(mem_dc, bitmap);

            let blit = BitBlt(
                mem_dc,
                0,
                0,
                width,
                height,
                screen_dc,
                region.left(),
                region.top(),
                SRCCOPY,
            );
            SelectObject(mem_dc, old_bitmap);

            // Negative height requests a top-down DIB
            let mut bmi = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: width,
                    biHeight: -height,
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };

            let lines = GetDIBits(
                mem_dc,
                bitmap,
                0,
                height as u32,
                Some(bgra.as_mut_ptr() as *mut std::ffi::c_void),
                &mut bmi,
                DIB_RGB_COLORS,
            );

            let _ = DeleteObject(bitmap);
            let _ = DeleteDC(mem_dc);
            ReleaseDC(HWND::default(), screen_dc);

            blit.map_err(|e| anyhow!("BitBlt failed for region {}: {}", region, e))?;
            if lines == 0 {
                return Err(anyhow!("GetDIBits failed for region {}", region));
            }
        }

        debug!("Captured {}", region);

        // BGRA -> RGBA
        let img: RgbaImage = ImageBuffer::from_fn(region.width(), region.height(), |x, y| {
            let offset = (y as usize * region.width() as usize + x as usize) * 4;
            Rgba([bgra[offset + 2], bgra[offset + 1], bgra[offset], 255])
        });
        Ok(img)
    }
}
