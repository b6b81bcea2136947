//! Macro recording and replay.
//!
//! This module provides:
//! - The persisted script format (`MacroScript`, JSON on disk)
//! - A recorder fed from the global input hub
//! - A player that reproduces relative timing through an `InputDriver`

pub mod player;
pub mod recorder;
pub mod recording;
pub mod script;

pub use player::MacroPlayer;
pub use recorder::MacroRecorder;
pub use recording::{record_macro, RecordingRequest};
pub use script::{EventAction, MacroScript, RecordedEvent, ScriptError};
