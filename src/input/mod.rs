//! Input simulation and global input observation.
//!
//! This module provides:
//! - The `InputDriver` seam used by controllers and macro replay
//! - `InputHub`, a fan-out of raw pointer/keyboard events to subscribers
//! - Windows backends: `SendInput` injection and an rdev global hook

pub mod hub;

#[cfg(windows)]
pub mod hook;
#[cfg(windows)]
pub mod sendinput;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::session::Coordinate;

pub use hub::{InputHub, InputSubscription, RawInput};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Middle => "middle",
        })
    }
}

/// A key identified by a lowercase name such as `"a"`, `"f8"` or `"esc"`.
///
/// Common aliases are folded when the name is built, so `"Escape"` and
/// `"esc"` compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct KeyName(String);

impl KeyName {
    pub fn new(name: impl AsRef<str>) -> Self {
        let lower = name.as_ref().trim().to_lowercase();
        let canonical = match lower.as_str() {
            "escape" => "esc",
            "return" => "enter",
            "control" | "ctrl_l" | "ctrl_r" => "ctrl",
            "alt_l" | "alt_r" | "alt_gr" | "menu" => "alt",
            "shift_l" | "shift_r" => "shift",
            "cmd" | "cmd_l" | "cmd_r" | "super" | "lwin" => "win",
            "del" => "delete",
            "bs" => "backspace",
            "pgup" | "page_up" => "pageup",
            "pgdn" | "page_down" => "pagedown",
            "caps_lock" => "capslock",
            "print_screen" => "printscreen",
            other => other,
        };
        Self(canonical.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for KeyName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<KeyName> for String {
    fn from(key: KeyName) -> Self {
        key.0
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Injects pointer and keyboard input at absolute screen coordinates.
///
/// Each call completes its input before returning. Implementations are shared
/// across watch threads.
pub trait InputDriver: Send + Sync {
    fn move_to(&self, at: Coordinate) -> Result<()>;

    /// Moves to `at`, then presses and releases `button`.
    fn click(&self, at: Coordinate, button: MouseButton) -> Result<()>;

    /// Presses and immediately releases `key`.
    fn press(&self, key: &KeyName) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_name_folds_aliases() {
        assert_eq!(KeyName::new("Escape"), KeyName::new("esc"));
        assert_eq!(KeyName::new(" F8 "), KeyName::new("f8"));
        assert_eq!(KeyName::new("Return").as_str(), "enter");
        assert_eq!(KeyName::new("ctrl_l").as_str(), "ctrl");
    }

    #[test]
    fn test_key_name_serde_normalizes() {
        let key: KeyName = serde_json::from_str("\"ESCAPE\"").unwrap();
        assert_eq!(key.as_str(), "esc");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"esc\"");
    }

    #[test]
    fn test_mouse_button_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MouseButton::Right).unwrap(), "\"right\"");
        let button: MouseButton = serde_json::from_str("\"middle\"").unwrap();
        assert_eq!(button, MouseButton::Middle);
        assert!(serde_json::from_str::<MouseButton>("\"x1\"").is_err());
    }
}
