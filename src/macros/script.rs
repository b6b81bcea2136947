//! Recorded macro scripts and their JSON file format.
//!
//! ```json
//! {"events": [
//!   {"timestamp": 0.0,  "event_type": "mouse_move",  "payload": {"x": 10, "y": 20}},
//!   {"timestamp": 0.41, "event_type": "mouse_click", "payload": {"x": 10, "y": 20, "button": "left"}},
//!   {"timestamp": 1.2,  "event_type": "keyboard",    "payload": {"key": "enter"}}
//! ]}
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::input::{KeyName, MouseButton};
use crate::session::Coordinate;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to access macro {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid macro {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid macro JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event {index} has invalid timestamp {timestamp}")]
    InvalidTimestamp { index: usize, timestamp: f64 },

    #[error("event {index} at {timestamp}s is earlier than the previous event at {previous}s")]
    OutOfOrder {
        index: usize,
        timestamp: f64,
        previous: f64,
    },
}

/// One replayable input action.
#[derive(Clone, Debug, PartialEq)]
pub enum EventAction {
    PointerMove { at: Coordinate },
    PointerClick { at: Coordinate, button: MouseButton },
    KeyPress { key: KeyName },
}

/// An action stamped with seconds since the recording started.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EventRepr", into = "EventRepr")]
pub struct RecordedEvent {
    pub timestamp: f64,
    pub action: EventAction,
}

impl RecordedEvent {
    pub fn new(timestamp: f64, action: EventAction) -> Self {
        Self { timestamp, action }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum EventKind {
    MouseMove,
    MouseClick,
    Keyboard,
}

#[derive(Serialize, Deserialize)]
struct EventRepr {
    timestamp: f64,
    event_type: EventKind,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Serialize, Deserialize)]
struct PointerPayload {
    x: i32,
    y: i32,
}

#[derive(Serialize, Deserialize)]
struct ClickPayload {
    x: i32,
    y: i32,
    #[serde(default = "default_button")]
    button: MouseButton,
}

#[derive(Serialize, Deserialize)]
struct KeyPayload {
    key: KeyName,
}

fn default_button() -> MouseButton {
    MouseButton::Left
}

impl TryFrom<EventRepr> for RecordedEvent {
    type Error = serde_json::Error;

    fn try_from(repr: EventRepr) -> Result<Self, Self::Error> {
        let action = match repr.event_type {
            EventKind::MouseMove => {
                let p: PointerPayload = serde_json::from_value(repr.payload)?;
                EventAction::PointerMove {
                    at: Coordinate::new(p.x, p.y),
                }
            }
            EventKind::MouseClick => {
                let p: ClickPayload = serde_json::from_value(repr.payload)?;
                EventAction::PointerClick {
                    at: Coordinate::new(p.x, p.y),
                    button: p.button,
                }
            }
            EventKind::Keyboard => {
                let p: KeyPayload = serde_json::from_value(repr.payload)?;
                EventAction::KeyPress { key: p.key }
            }
        };
        Ok(Self {
            timestamp: repr.timestamp,
            action,
        })
    }
}

impl From<RecordedEvent> for EventRepr {
    fn from(event: RecordedEvent) -> Self {
        let (event_type, payload) = match event.action {
            EventAction::PointerMove { at } => (
                EventKind::MouseMove,
                serde_json::json!(PointerPayload { x: at.x, y: at.y }),
            ),
            EventAction::PointerClick { at, button } => (
                EventKind::MouseClick,
                serde_json::json!(ClickPayload {
                    x: at.x,
                    y: at.y,
                    button,
                }),
            ),
            EventAction::KeyPress { key } => {
                (EventKind::Keyboard, serde_json::json!(KeyPayload { key }))
            }
        };
        Self {
            timestamp: event.timestamp,
            event_type,
            payload,
        }
    }
}

/// An immutable, time-ordered sequence of recorded events.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScriptRepr", into = "ScriptRepr")]
pub struct MacroScript {
    events: Vec<RecordedEvent>,
}

#[derive(Serialize, Deserialize)]
struct ScriptRepr {
    #[serde(default)]
    events: Vec<RecordedEvent>,
}

impl TryFrom<ScriptRepr> for MacroScript {
    type Error = ScriptError;

    fn try_from(repr: ScriptRepr) -> Result<Self, Self::Error> {
        MacroScript::new(repr.events)
    }
}

impl From<MacroScript> for ScriptRepr {
    fn from(script: MacroScript) -> Self {
        Self {
            events: script.events,
        }
    }
}

/// Longest accepted recording, in seconds.
pub const MAX_TIMESTAMP_SECS: f64 = 24.0 * 60.0 * 60.0;

impl MacroScript {
    /// Validates that timestamps are finite, within a day and never decrease.
    pub fn new(events: Vec<RecordedEvent>) -> Result<Self, ScriptError> {
        let mut previous = 0.0;
        for (index, event) in events.iter().enumerate() {
            let timestamp = event.timestamp;
            if !(0.0..=MAX_TIMESTAMP_SECS).contains(&timestamp) {
                return Err(ScriptError::InvalidTimestamp { index, timestamp });
            }
            if timestamp < previous {
                return Err(ScriptError::OutOfOrder {
                    index,
                    timestamp,
                    previous,
                });
            }
            previous = timestamp;
        }
        Ok(Self { events })
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Timestamp of the last event, in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.events.last().map_or(0.0, |e| e.timestamp)
    }

    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ScriptError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let contents = fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ScriptError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like `load`, but a missing file means "no script configured".
    pub fn load_optional(path: &Path) -> Result<Option<Self>, ScriptError> {
        match Self::load(path) {
            Ok(script) => Ok(Some(script)),
            Err(ScriptError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Writes the script as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ScriptError> {
        let io_err = |source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, self.to_json()?).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_events() -> Vec<RecordedEvent> {
        vec![
            RecordedEvent::new(
                0.0,
                EventAction::PointerMove {
                    at: Coordinate::new(10, 20),
                },
            ),
            RecordedEvent::new(
                0.41,
                EventAction::PointerClick {
                    at: Coordinate::new(10, 20),
                    button: MouseButton::Right,
                },
            ),
            RecordedEvent::new(
                0.41,
                EventAction::KeyPress {
                    key: KeyName::new("enter"),
                },
            ),
            RecordedEvent::new(
                1.25,
                EventAction::PointerMove {
                    at: Coordinate::new(-5, 300),
                },
            ),
        ]
    }

    #[test]
    fn test_save_and_load_preserves_events() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("macros").join("below.json");

        let script = MacroScript::new(sample_events()).unwrap();
        script.save(&path).unwrap();
        let loaded = MacroScript::load(&path).unwrap();

        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded, script);
        for (a, b) in loaded.events().iter().zip(script.events()) {
            assert_eq!(a.timestamp, b.timestamp);
        }
    }

    #[test]
    fn test_file_format() {
        let json = r#"{"events": [
            {"timestamp": 0.5, "event_type": "mouse_click", "payload": {"x": 3, "y": 4, "button": "left"}},
            {"timestamp": 0.75, "event_type": "keyboard", "payload": {"key": "Escape"}}
        ]}"#;
        let script = MacroScript::from_json(json).unwrap();
        assert_eq!(
            script.events()[0].action,
            EventAction::PointerClick {
                at: Coordinate::new(3, 4),
                button: MouseButton::Left
            }
        );
        assert_eq!(
            script.events()[1].action,
            EventAction::KeyPress {
                key: KeyName::new("esc")
            }
        );

        let value: serde_json::Value = serde_json::from_str(&script.to_json().unwrap()).unwrap();
        assert_eq!(value["events"][0]["event_type"], "mouse_click");
        assert_eq!(value["events"][0]["payload"]["x"], 3);
        assert_eq!(value["events"][1]["payload"]["key"], "esc");
    }

    #[test]
    fn test_click_button_defaults_to_left() {
        let json = r#"{"events": [
            {"timestamp": 0.0, "event_type": "mouse_click", "payload": {"x": 1, "y": 2}}
        ]}"#;
        let script = MacroScript::from_json(json).unwrap();
        assert!(matches!(
            script.events()[0].action,
            EventAction::PointerClick {
                button: MouseButton::Left,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        let json = r#"{"events": [
            {"timestamp": 0.0, "event_type": "scroll", "payload": {"dy": 3}}
        ]}"#;
        assert!(MacroScript::from_json(json).is_err());
    }

    #[test]
    fn test_malformed_payload_rejected() {
        let json = r#"{"events": [
            {"timestamp": 0.0, "event_type": "mouse_move", "payload": {"x": 1}}
        ]}"#;
        assert!(MacroScript::from_json(json).is_err());
    }

    #[test]
    fn test_ordering_validated() {
        let mut events = sample_events();
        events.swap(1, 3);
        assert!(matches!(
            MacroScript::new(events),
            Err(ScriptError::OutOfOrder { index: 2, .. })
        ));

        let negative = vec![RecordedEvent::new(
            -0.1,
            EventAction::KeyPress {
                key: KeyName::new("a"),
            },
        )];
        assert!(matches!(
            MacroScript::new(negative),
            Err(ScriptError::InvalidTimestamp { index: 0, .. })
        ));

        let json = r#"{"events": [
            {"timestamp": 2.0, "event_type": "keyboard", "payload": {"key": "a"}},
            {"timestamp": 1.0, "event_type": "keyboard", "payload": {"key": "b"}}
        ]}"#;
        assert!(MacroScript::from_json(json).is_err());
    }

    #[test]
    fn test_oversized_timestamp_rejected() {
        let json = r#"{"events": [
            {"timestamp": 0.0, "event_type": "keyboard", "payload": {"key": "a"}},
            {"timestamp": 1e300, "event_type": "keyboard", "payload": {"key": "b"}}
        ]}"#;
        assert!(MacroScript::from_json(json).is_err());

        let late = vec![RecordedEvent::new(
            MAX_TIMESTAMP_SECS + 1.0,
            EventAction::KeyPress {
                key: KeyName::new("a"),
            },
        )];
        assert!(matches!(
            MacroScript::new(late),
            Err(ScriptError::InvalidTimestamp { index: 0, .. })
        ));
    }

    #[test]
    fn test_load_optional_missing_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(MacroScript::load_optional(&missing).unwrap().is_none());

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{").unwrap();
        assert!(matches!(
            MacroScript::load_optional(&broken),
            Err(ScriptError::Parse { .. })
        ));
    }

    #[test]
    fn test_empty_script() {
        let script = MacroScript::from_json("{}").unwrap();
        assert!(script.is_empty());
        assert_eq!(script.duration_secs(), 0.0);
    }
}
