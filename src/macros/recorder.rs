use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::script::{EventAction, MacroScript, RecordedEvent};
use crate::input::RawInput;

#[derive(Default)]
struct RecorderState {
    started: Option<Instant>,
    events: Vec<RecordedEvent>,
    last_timestamp: f64,
}

/// Accumulates raw input into a script.
///
/// Cloned handles share one recording, so the hook-feeding thread and the
/// thread that calls `stop` can be different.
#[derive(Clone, Default)]
pub struct MacroRecorder {
    state: Arc<Mutex<RecorderState>>,
}

impl MacroRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a fresh recording, discarding anything not yet stopped.
    pub fn start(&self) {
        let mut state = self.lock();
        *state = RecorderState {
            started: Some(Instant::now()),
            ..Default::default()
        };
    }

    pub fn is_recording(&self) -> bool {
        self.lock().started.is_some()
    }

    /// Records `input` at the current time. Returns whether it was kept.
    pub fn record(&self, input: &RawInput) -> bool {
        let elapsed = match self.lock().started {
            Some(started) => started.elapsed(),
            None => return false,
        };
        self.record_at(input, elapsed)
    }

    /// Records `input` at `elapsed` since start.
    ///
    /// Releases are dropped. Timestamps are clamped so they never decrease.
    pub fn record_at(&self, input: &RawInput, elapsed: Duration) -> bool {
        let action = match input {
            RawInput::PointerMoved(at) => EventAction::PointerMove { at: *at },
            RawInput::ButtonPressed { at, button } => EventAction::PointerClick {
                at: *at,
                button: *button,
            },
            RawInput::KeyPressed(key) => EventAction::KeyPress { key: key.clone() },
            RawInput::ButtonReleased { .. } | RawInput::KeyReleased(_) => return false,
        };

        let mut state = self.lock();
        if state.started.is_none() {
            return false;
        }
        let timestamp = elapsed.as_secs_f64().max(state.last_timestamp);
        state.last_timestamp = timestamp;
        state.events.push(RecordedEvent::new(timestamp, action));
        true
    }

    /// Ends the recording and returns its script.
    ///
    /// Stopping an idle recorder yields an empty script.
    pub fn stop(&self) -> MacroScript {
        let mut state = self.lock();
        let events = std::mem::take(&mut state.events);
        *state = RecorderState::default();
        // Timestamps were clamped on insert, so validation cannot fail
        MacroScript::new(events).unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
