//! Cursor position from the OS, for when the hook has not seen the pointer yet.

use crate::session::Coordinate;

/// Gets the current cursor position in screen coordinates.
#[cfg(windows)]
pub fn cursor_position() -> Option<Coordinate> {
    use windows::Win32::Foundation::POINT;
    use windows::Win32::UI::WindowsAndMessaging::GetCursorPos;

    let mut pt = POINT::default();
    unsafe { GetCursorPos(&mut pt).ok()? };
    Some(Coordinate::new(pt.x, pt.y))
}

#[cfg(not(windows))]
pub fn cursor_position() -> Option<Coordinate> {
    None
}
