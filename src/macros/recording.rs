//! Interactive recording: countdown, capture until the stop hotkey, save.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::recorder::MacroRecorder;
use super::script::MacroScript;
use crate::automation::{StatusEvent, StatusReporter, StopSignal};
use crate::input::{InputHub, KeyName, RawInput};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Settings for one recording run.
#[derive(Clone, Debug)]
pub struct RecordingRequest {
    pub output: PathBuf,
    pub countdown: Duration,
    pub stop_key: KeyName,
}

/// Records one macro from global input.
///
/// Counts down in whole seconds, then records until `stop_key` is pressed or
/// `stop` is requested. The stop key press itself is not recorded. Returns
/// `None` if the countdown was interrupted; nothing is written in that case.
pub fn record_macro(
    hub: &InputHub,
    request: &RecordingRequest,
    stop: &StopSignal,
    reporter: &StatusReporter,
) -> Result<Option<MacroScript>> {
    if !countdown(request.countdown, stop, reporter) {
        reporter.emit(StatusEvent::RecordingCancelled);
        return Ok(None);
    }

    let subscription = hub.subscribe();
    let recorder = MacroRecorder::new();
    recorder.start();
    reporter.emit(StatusEvent::RecordingStarted {
        stop_key: request.stop_key.clone(),
    });

    while !stop.is_requested() {
        let Some(event) = subscription.recv_timeout(POLL_INTERVAL) else {
            continue;
        };
        match &event {
            RawInput::KeyPressed(key) if *key == request.stop_key => break,
            RawInput::KeyReleased(key) if *key == request.stop_key => {}
            _ => {
                recorder.record(&event);
            }
        }
    }
    drop(subscription);

    let script = recorder.stop();
    save_script(&script, &request.output)?;
    reporter.emit(StatusEvent::RecordingSaved {
        path: request.output.clone(),
        events: script.len(),
    });
    Ok(Some(script))
}

/// Returns `false` if stopped before the countdown finished.
fn countdown(total: Duration, stop: &StopSignal, reporter: &StatusReporter) -> bool {
    let mut remaining = total;
    while !remaining.is_zero() {
        let secs = remaining.as_secs_f64().ceil() as u64;
        reporter.emit(StatusEvent::RecordingCountdown {
            remaining_secs: secs,
        });
        let step = remaining.min(Duration::from_secs(1));
        if stop.wait(step) {
            return false;
        }
        remaining -= step;
    }
    !stop.is_requested()
}

fn save_script(script: &MacroScript, path: &Path) -> Result<()> {
    script
        .save(path)
        .with_context(|| format!("Failed to save macro to {}", path.display()))?;
    debug!("Saved {} events to {}", script.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MouseButton;
    use crate::macros::EventAction;
    use crate::session::Coordinate;
    use std::sync::mpsc::Receiver;
    use std::thread;
    use std::time::Instant;

    fn wait_for_started(rx: &Receiver<StatusEvent>) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Ok(StatusEvent::RecordingStarted { .. }) =
                rx.recv_timeout(Duration::from_millis(100))
            {
                return;
            }
        }
        panic!("recording never started");
    }

    fn request(dir: &Path, countdown: Duration) -> RecordingRequest {
        RecordingRequest {
            output: dir.join("macros").join("above.json"),
            countdown,
            stop_key: KeyName::new("f9"),
        }
    }

    #[test]
    fn test_records_until_stop_key() {
        let dir = tempfile::tempdir().unwrap();
        let hub = InputHub::new();
        let (reporter, rx) = StatusReporter::channel();
        let stop = StopSignal::new();
        let req = request(dir.path(), Duration::ZERO);

        let worker = {
            let hub = hub.clone();
            let req = req.clone();
            thread::spawn(move || record_macro(&hub, &req, &stop, &reporter))
        };
        wait_for_started(&rx);

        let at = Coordinate::new(40, 50);
        hub.publish(RawInput::PointerMoved(at));
        hub.publish(RawInput::ButtonPressed {
            at,
            button: MouseButton::Left,
        });
        hub.publish(RawInput::ButtonReleased {
            at,
            button: MouseButton::Left,
        });
        hub.publish(RawInput::KeyPressed(KeyName::new("f9")));

        let script = worker.join().unwrap().unwrap().unwrap();
        assert_eq!(script.len(), 2);
        assert!(matches!(
            script.events()[1].action,
            EventAction::PointerClick { .. }
        ));
        assert!(
            script
                .events()
                .iter()
                .all(|e| !matches!(&e.action, EventAction::KeyPress { .. }))
        );

        let saved = MacroScript::load(&req.output).unwrap();
        assert_eq!(saved, script);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_stop_during_countdown_cancels() {
        let dir = tempfile::tempdir().unwrap();
        let hub = InputHub::new();
        let (reporter, rx) = StatusReporter::channel();
        let stop = StopSignal::new();
        let req = request(dir.path(), Duration::from_secs(3));

        let worker = {
            let stop = stop.clone();
            let req = req.clone();
            thread::spawn(move || record_macro(&hub, &req, &stop, &reporter))
        };
        thread::sleep(Duration::from_millis(50));
        stop.request();

        assert!(worker.join().unwrap().unwrap().is_none());
        assert!(!req.output.exists());
        let events: Vec<StatusEvent> = rx.try_iter().collect();
        assert!(events.contains(&StatusEvent::RecordingCancelled));
    }

    #[test]
    fn test_stop_signal_ends_recording() {
        let dir = tempfile::tempdir().unwrap();
        let hub = InputHub::new();
        let (reporter, rx) = StatusReporter::channel();
        let stop = StopSignal::new();
        let req = request(dir.path(), Duration::ZERO);

        let worker = {
            let hub = hub.clone();
            let stop = stop.clone();
            let req = req.clone();
            thread::spawn(move || record_macro(&hub, &req, &stop, &reporter))
        };
        wait_for_started(&rx);
        hub.publish(RawInput::KeyPressed(KeyName::new("a")));
        thread::sleep(Duration::from_millis(100));
        stop.request();

        let script = worker.join().unwrap().unwrap().unwrap();
        assert_eq!(script.len(), 1);
        assert!(req.output.exists());
    }
}
