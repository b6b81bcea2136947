//! Hardware-level input simulation with `SendInput`.
//!
//! Pointer events use `MOUSEEVENTF_ABSOLUTE`, which expects coordinates
//! normalized to 0..=65535 across the primary screen.

use anyhow::{anyhow, Result};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use windows::Win32::UI::Input::KeyboardAndMouse::*;
use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

use super::{InputDriver, KeyName, MouseButton};
use crate::session::Coordinate;

/// Pause between the move and the button going down.
const MOVE_SETTLE: Duration = Duration::from_millis(30);
/// How long a button or key is held.
const HOLD: Duration = Duration::from_millis(30);

pub struct SendInputDriver;

impl SendInputDriver {
    /// Fails if the primary screen metrics are unavailable.
    pub fn new() -> Result<Self> {
        let (width, height) = screen_size();
        if width <= 0 || height <= 0 {
            return Err(anyhow!("Input driver unavailable: no primary screen"));
        }
        info!("SendInput driver ready ({}x{})", width, height);
        Ok(Self)
    }
}

fn screen_size() -> (i32, i32) {
    unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) }
}

fn normalize(at: Coordinate) -> (i32, i32) {
    let (width, height) = screen_size();
    let norm_x = ((at.x as i64 * 65535) / width.max(1) as i64) as i32;
    let norm_y = ((at.y as i64 * 65535) / height.max(1) as i64) as i32;
    (norm_x, norm_y)
}

fn mouse_input(at: Coordinate, flags: MOUSE_EVENT_FLAGS) -> INPUT {
    let (dx, dy) = normalize(at);
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                dwFlags: flags | MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE,
                ..Default::default()
            },
        },
    }
}

fn key_input(vk: VIRTUAL_KEY, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    let ext = if is_extended_key(vk) {
        KEYEVENTF_EXTENDEDKEY
    } else {
        KEYBD_EVENT_FLAGS(0)
    };
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                dwFlags: ext | flags,
                ..Default::default()
            },
        },
    }
}

fn send(input: INPUT) -> Result<()> {
    let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
    if sent != 1 {
        return Err(anyhow!("SendInput was blocked"));
    }
    Ok(())
}

impl InputDriver for SendInputDriver {
    fn move_to(&self, at: Coordinate) -> Result<()> {
        send(mouse_input(at, MOUSE_EVENT_FLAGS(0)))
    }

    fn click(&self, at: Coordinate, button: MouseButton) -> Result<()> {
        let (down, up) = match button {
            MouseButton::Left => (MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP),
            MouseButton::Right => (MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP),
            MouseButton::Middle => (MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP),
        };
        debug!("Click {} at {}", button, at);

        self.move_to(at)?;
        thread::sleep(MOVE_SETTLE);
        send(mouse_input(at, down))?;
        thread::sleep(HOLD);
        send(mouse_input(at, up))
    }

    fn press(&self, key: &KeyName) -> Result<()> {
        let vk = key_to_vk(key.as_str()).ok_or_else(|| anyhow!("Unknown key '{}'", key))?;
        debug!("Press {}", key);

        send(key_input(vk, KEYBD_EVENT_FLAGS(0)))?;
        thread::sleep(HOLD);
        send(key_input(vk, KEYEVENTF_KEYUP))
    }
}

fn key_to_vk(name: &str) -> Option<VIRTUAL_KEY> {
    if let Some(code) = name.strip_prefix("vk").and_then(|c| c.parse::<u16>().ok()) {
        return Some(VIRTUAL_KEY(code));
    }

    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.clone().next()) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            return Some(VIRTUAL_KEY(c.to_ascii_uppercase() as u16));
        }
    }

    let vk = match name {
        "f1" => VK_F1,
        "f2" => VK_F2,
        "f3" => VK_F3,
        "f4" => VK_F4,
        "f5" => VK_F5,
        "f6" => VK_F6,
        "f7" => VK_F7,
        "f8" => VK_F8,
        "f9" => VK_F9,
        "f10" => VK_F10,
        "f11" => VK_F11,
        "f12" => VK_F12,
        "ctrl" => VK_CONTROL,
        "alt" => VK_MENU,
        "shift" => VK_SHIFT,
        "win" => VK_LWIN,
        "rwin" => VK_RWIN,
        "enter" => VK_RETURN,
        "tab" => VK_TAB,
        "esc" => VK_ESCAPE,
        "space" => VK_SPACE,
        "backspace" => VK_BACK,
        "delete" => VK_DELETE,
        "insert" => VK_INSERT,
        "home" => VK_HOME,
        "end" => VK_END,
        "pageup" => VK_PRIOR,
        "pagedown" => VK_NEXT,
        "up" => VK_UP,
        "down" => VK_DOWN,
        "left" => VK_LEFT,
        "right" => VK_RIGHT,
        "printscreen" => VK_SNAPSHOT,
        "scrolllock" => VK_SCROLL,
        "pause" => VK_PAUSE,
        "numlock" => VK_NUMLOCK,
        "capslock" => VK_CAPITAL,
        ";" => VK_OEM_1,
        "=" => VK_OEM_PLUS,
        "," => VK_OEM_COMMA,
        "-" => VK_OEM_MINUS,
        "." => VK_OEM_PERIOD,
        "/" => VK_OEM_2,
        "`" => VK_OEM_3,
        "[" => VK_OEM_4,
        "\\" => VK_OEM_5,
        "]" => VK_OEM_6,
        "'" => VK_OEM_7,
        "num0" => VK_NUMPAD0,
        "num1" => VK_NUMPAD1,
        "num2" => VK_NUMPAD2,
        "num3" => VK_NUMPAD3,
        "num4" => VK_NUMPAD4,
        "num5" => VK_NUMPAD5,
        "num6" => VK_NUMPAD6,
        "num7" => VK_NUMPAD7,
        "num8" => VK_NUMPAD8,
        "num9" => VK_NUMPAD9,
        "multiply" => VK_MULTIPLY,
        "add" => VK_ADD,
        "subtract" => VK_SUBTRACT,
        "decimal" => VK_DECIMAL,
        "divide" => VK_DIVIDE,
        _ => return None,
    };
    Some(vk)
}

/// Extended flag needed for arrows, the navigation cluster and a few others.
fn is_extended_key(vk: VIRTUAL_KEY) -> bool {
    matches!(
        vk,
        VK_UP
            | VK_DOWN
            | VK_LEFT
            | VK_RIGHT
            | VK_INSERT
            | VK_DELETE
            | VK_HOME
            | VK_END
            | VK_PRIOR
            | VK_NEXT
            | VK_NUMLOCK
            | VK_SNAPSHOT
            | VK_RWIN
            | VK_DIVIDE
    )
}
