//! Full-screen capture overlay.
//!
//! The overlay dims the screen and swallows clicks so pointing at a UI
//! element does not activate it. Input itself is observed through the global
//! hook, not through the overlay window.

use anyhow::Result;

/// A surface shown while a capture is pending.
pub trait Overlay: Send + Sync {
    fn show(&self, prompt: &str) -> Result<()>;
    fn hide(&self);
}

/// Shows nothing. Used in tests and when no display is available.
#[derive(Default)]
pub struct NoOverlay;

impl Overlay for NoOverlay {
    fn show(&self, _prompt: &str) -> Result<()> {
        Ok(())
    }

    fn hide(&self) {}
}

/// Hides the overlay when dropped.
pub struct OverlayGuard<'a> {
    overlay: &'a dyn Overlay,
}

impl<'a> OverlayGuard<'a> {
    pub fn show(overlay: &'a dyn Overlay, prompt: &str) -> Result<Self> {
        overlay.show(prompt)?;
        Ok(Self { overlay })
    }
}

impl Drop for OverlayGuard<'_> {
    fn drop(&mut self) {
        self.overlay.hide();
    }
}

#[cfg(windows)]
pub use win32::ScreenOverlay;

#[cfg(windows)]
mod win32 {
    use anyhow::{anyhow, Result};
    use std::sync::mpsc;
    use std::sync::{Mutex, MutexGuard};
    use std::thread::{self, JoinHandle};
    use tracing::{debug, warn};
    use windows::core::{w, HSTRING};
    use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, WPARAM};
    use windows::Win32::Graphics::Gdi::{GetStockObject, BLACK_BRUSH, HBRUSH};
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DispatchMessageW, GetMessageW, GetSystemMetrics,
        LoadCursorW, PostMessageW, PostQuitMessage, RegisterClassW, SetLayeredWindowAttributes,
        TranslateMessage, IDC_CROSS, LWA_ALPHA, MSG, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN,
        SM_XVIRTUALSCREEN, SM_YVIRTUALSCREEN, WM_CLOSE, WM_DESTROY, WNDCLASSW, WS_EX_LAYERED,
        WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP, WS_VISIBLE,
    };

    use super::Overlay;

    const OVERLAY_ALPHA: u8 = 60;

    /// Layered topmost window covering the virtual screen.
    ///
    /// Each `show` runs the window and its message loop on a dedicated thread.
    /// HWND is stored as isize so the handle can cross threads.
    #[derive(Default)]
    pub struct ScreenOverlay {
        active: Mutex<Option<(isize, JoinHandle<()>)>>,
    }

    impl ScreenOverlay {
        pub fn new() -> Self {
            Self::default()
        }

        fn lock(&self) -> MutexGuard<'_, Option<(isize, JoinHandle<()>)>> {
            self.active.lock().unwrap_or_else(|p| p.into_inner())
        }
    }

    impl Overlay for ScreenOverlay {
        fn show(&self, prompt: &str) -> Result<()> {
            self.hide();

            let (tx, rx) = mpsc::channel();
            let title = format!("shopwatch - {}", prompt);
            let handle = thread::spawn(move || {
                match create_overlay_window(&title) {
                    Ok(hwnd) => {
                        let _ = tx.send(Ok(hwnd.0 as isize));
                        run_message_loop();
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e));
                    }
                }
            });

            let hwnd = rx
                .recv()
                .map_err(|_| anyhow!("Overlay thread exited before creating its window"))??;
            *self.lock() = Some((hwnd, handle));
            debug!("Overlay shown: {}", prompt);
            Ok(())
        }

        fn hide(&self) {
            let Some((hwnd, handle)) = self.lock().take() else {
                return;
            };
            let hwnd = HWND(hwnd as *mut std::ffi::c_void);
            unsafe {
                if let Err(e) = PostMessageW(hwnd, WM_CLOSE, WPARAM(0), LPARAM(0)) {
                    warn!("Failed to close overlay: {}", e);
                    return;
                }
            }
            if handle.join().is_err() {
                warn!("Overlay thread terminated abnormally");
            }
        }
    }

    fn create_overlay_window(title: &str) -> Result<HWND> {
        unsafe {
            let hinstance = GetModuleHandleW(None)?;
            let class_name = w!("ShopwatchCaptureOverlay");

            let wc = WNDCLASSW {
                lpfnWndProc: Some(overlay_proc),
                hInstance: hinstance.into(),
                lpszClassName: class_name,
                hCursor: LoadCursorW(None, IDC_CROSS)?,
                hbrBackground: HBRUSH(GetStockObject(BLACK_BRUSH).0),
                ..Default::default()
            };
            // Fails harmlessly when the class is already registered
            RegisterClassW(&wc);

            let hwnd = CreateWindowExW(
                WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_TOOLWINDOW,
                class_name,
                &HSTRING::from(title),
                WS_POPUP | WS_VISIBLE,
                GetSystemMetrics(SM_XVIRTUALSCREEN),
                GetSystemMetrics(SM_YVIRTUALSCREEN),
                GetSystemMetrics(SM_CXVIRTUALSCREEN),
                GetSystemMetrics(SM_CYVIRTUALSCREEN),
                None,
                None,
                hinstance,
                None,
            )?;

            SetLayeredWindowAttributes(hwnd, COLORREF(0), OVERLAY_ALPHA, LWA_ALPHA)?;
            Ok(hwnd)
        }
    }

    fn run_message_loop() {
        unsafe {
            let mut msg = MSG::default();
            while GetMessageW(&mut msg, HWND::default(), 0, 0).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }

    unsafe extern "system" fn overlay_proc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        unsafe {
            match msg {
                WM_DESTROY => {
                    PostQuitMessage(0);
                    LRESULT(0)
                }
                _ => DefWindowProcW(hwnd, msg, wparam, lparam),
            }
        }
    }
}
