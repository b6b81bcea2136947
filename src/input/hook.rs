//! Global input hook built on `rdev::listen`.

use anyhow::{anyhow, Result};
use rdev::{Button, EventType, Key};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

use super::{InputHub, KeyName, MouseButton, RawInput};
use crate::session::Coordinate;

/// How long to wait for the listener to report an installation failure.
const HOOK_STARTUP_GRACE: Duration = Duration::from_millis(300);

/// Installs the process-wide hook and forwards events into `hub`.
///
/// The listener thread lives until process exit. Fails if the hook cannot be
/// installed.
pub fn start_global_hook(hub: InputHub) -> Result<()> {
    let (err_tx, err_rx) = mpsc::channel::<String>();

    thread::Builder::new()
        .name("input-hook".into())
        .spawn(move || {
            let result = rdev::listen(move |event| {
                if let Some(raw) = translate(&hub, event.event_type) {
                    hub.publish(raw);
                }
            });
            if let Err(e) = result {
                error!("Global input hook failed: {:?}", e);
                let _ = err_tx.send(format!("{:?}", e));
            }
        })?;

    match err_rx.recv_timeout(HOOK_STARTUP_GRACE) {
        Ok(e) => Err(anyhow!("Failed to install global input hook: {}", e)),
        Err(_) => {
            info!("Global input hook installed");
            Ok(())
        }
    }
}

fn translate(hub: &InputHub, event: EventType) -> Option<RawInput> {
    match event {
        EventType::MouseMove { x, y } => {
            Some(RawInput::PointerMoved(Coordinate::new(x as i32, y as i32)))
        }
        // Button events carry no position; use the last move
        EventType::ButtonPress(button) => Some(RawInput::ButtonPressed {
            at: hub.pointer_position()?,
            button: map_button(button)?,
        }),
        EventType::ButtonRelease(button) => Some(RawInput::ButtonReleased {
            at: hub.pointer_position()?,
            button: map_button(button)?,
        }),
        EventType::KeyPress(key) => Some(RawInput::KeyPressed(key_name(key))),
        EventType::KeyRelease(key) => Some(RawInput::KeyReleased(key_name(key))),
        EventType::Wheel { .. } => None,
    }
}

fn map_button(button: Button) -> Option<MouseButton> {
    match button {
        Button::Left => Some(MouseButton::Left),
        Button::Right => Some(MouseButton::Right),
        Button::Middle => Some(MouseButton::Middle),
        Button::Unknown(_) => None,
    }
}

/// Maps an rdev key to the names understood by the `SendInput` driver.
fn key_name(key: Key) -> KeyName {
    let name = match key {
        Key::KeyA => "a",
        Key::KeyB => "b",
        Key::KeyC => "c",
        Key::KeyD => "d",
        Key::KeyE => "e",
        Key::KeyF => "f",
        Key::KeyG => "g",
        Key::KeyH => "h",
        Key::KeyI => "i",
        Key::KeyJ => "j",
        Key::KeyK => "k",
        Key::KeyL => "l",
        Key::KeyM => "m",
        Key::KeyN => "n",
        Key::KeyO => "o",
        Key::KeyP => "p",
        Key::KeyQ => "q",
        Key::KeyR => "r",
        Key::KeyS => "s",
        Key::KeyT => "t",
        Key::KeyU => "u",
        Key::KeyV => "v",
        Key::KeyW => "w",
        Key::KeyX => "x",
        Key::KeyY => "y",
        Key::KeyZ => "z",
        Key::Num0 => "0",
        Key::Num1 => "1",
        Key::Num2 => "2",
        Key::Num3 => "3",
        Key::Num4 => "4",
        Key::Num5 => "5",
        Key::Num6 => "6",
        Key::Num7 => "7",
        Key::Num8 => "8",
        Key::Num9 => "9",
        Key::F1 => "f1",
        Key::F2 => "f2",
        Key::F3 => "f3",
        Key::F4 => "f4",
        Key::F5 => "f5",
        Key::F6 => "f6",
        Key::F7 => "f7",
        Key::F8 => "f8",
        Key::F9 => "f9",
        Key::F10 => "f10",
        Key::F11 => "f11",
        Key::F12 => "f12",
        Key::Escape => "esc",
        Key::Return | Key::KpReturn => "enter",
        Key::Space => "space",
        Key::Tab => "tab",
        Key::Backspace => "backspace",
        Key::Delete | Key::KpDelete => "delete",
        Key::Insert => "insert",
        Key::Home => "home",
        Key::End => "end",
        Key::PageUp => "pageup",
        Key::PageDown => "pagedown",
        Key::UpArrow => "up",
        Key::DownArrow => "down",
        Key::LeftArrow => "left",
        Key::RightArrow => "right",
        Key::ShiftLeft | Key::ShiftRight => "shift",
        Key::ControlLeft | Key::ControlRight => "ctrl",
        Key::Alt | Key::AltGr => "alt",
        Key::MetaLeft => "win",
        Key::MetaRight => "rwin",
        Key::CapsLock => "capslock",
        Key::NumLock => "numlock",
        Key::ScrollLock => "scrolllock",
        Key::PrintScreen => "printscreen",
        Key::Pause => "pause",
        Key::Minus | Key::KpMinus => "-",
        Key::Equal => "=",
        Key::KpPlus => "add",
        Key::KpMultiply => "multiply",
        Key::KpDivide => "divide",
        Key::Comma => ",",
        Key::Dot => ".",
        Key::Slash => "/",
        Key::SemiColon => ";",
        Key::Quote => "'",
        Key::BackQuote => "`",
        Key::BackSlash | Key::IntlBackslash => "\\",
        Key::LeftBracket => "[",
        Key::RightBracket => "]",
        Key::Kp0 => "num0",
        Key::Kp1 => "num1",
        Key::Kp2 => "num2",
        Key::Kp3 => "num3",
        Key::Kp4 => "num4",
        Key::Kp5 => "num5",
        Key::Kp6 => "num6",
        Key::Kp7 => "num7",
        Key::Kp8 => "num8",
        Key::Kp9 => "num9",
        Key::Unknown(code) => return KeyName::new(format!("vk{}", code)),
        other => return KeyName::new(format!("{:?}", other)),
    };
    KeyName::new(name)
}
