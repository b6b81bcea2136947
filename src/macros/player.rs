use anyhow::Result;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use super::script::{EventAction, MacroScript, RecordedEvent};
use crate::input::InputDriver;

/// Replays scripts through an `InputDriver`, reproducing relative timing.
#[derive(Clone)]
pub struct MacroPlayer {
    input: Arc<dyn InputDriver>,
}

impl MacroPlayer {
    pub fn new(input: Arc<dyn InputDriver>) -> Self {
        Self { input }
    }

    /// Runs `script` to completion on the calling thread.
    ///
    /// The first event fires immediately. Before each later event the player
    /// waits for the recorded gap minus the time the previous action took,
    /// floored at zero.
    pub fn play(&self, script: &MacroScript) -> Result<()> {
        let mut previous: Option<(f64, Duration)> = None;

        for event in script.events() {
            if let Some((prev_timestamp, prev_elapsed)) = previous {
                let wait = replay_wait(prev_timestamp, event.timestamp, prev_elapsed);
                if !wait.is_zero() {
                    thread::sleep(wait);
                }
            }

            let started = Instant::now();
            self.perform(event)?;
            previous = Some((event.timestamp, started.elapsed()));
        }

        debug!("Replayed {} events", script.len());
        Ok(())
    }

    fn perform(&self, event: &RecordedEvent) -> Result<()> {
        match &event.action {
            EventAction::PointerMove { at } => self.input.move_to(*at),
            EventAction::PointerClick { at, button } => self.input.click(*at, *button),
            EventAction::KeyPress { key } => self.input.press(key),
        }
    }
}

/// `max(0, (current - previous) - elapsed)`
pub fn replay_wait(previous: f64, current: f64, elapsed: Duration) -> Duration {
    let gap = (current - previous).max(0.0);
    Duration::try_from_secs_f64(gap)
        .unwrap_or(Duration::MAX)
        .saturating_sub(elapsed)
}
