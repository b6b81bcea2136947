//! Status notifications from controllers, recording and capture.

use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::info;

use crate::input::KeyName;
use crate::session::{AnchorRole, Color};

/// Which Mode Two macro a tick selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Branch {
    AboveThreshold,
    BelowThreshold,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AboveThreshold => "above-threshold",
            Self::BelowThreshold => "below-threshold",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StatusEvent {
    ModeOneStarted { workers: usize },
    ModeOneStopped,
    ModeTwoStarted,
    ModeTwoStopped,
    AboveThreshold { target: String, price: f64, threshold: f64 },
    BelowThreshold { target: String, price: f64, threshold: f64 },
    MissingAnchor { target: String, role: AnchorRole },
    ConfigIncomplete { target: String, detail: String },
    ConfirmationFailed { target: String, price: Option<f64>, threshold: f64 },
    Executed { target: String },
    MacroExecuted { branch: Branch, events: usize },
    TerminationMatched { color: Color },
    WorkerExited { target: String },
    TickFailed { target: String, error: String },
    RecordingCountdown { remaining_secs: u64 },
    RecordingStarted { stop_key: KeyName },
    RecordingSaved { path: PathBuf, events: usize },
    RecordingCancelled,
    CapturePrompt { step: String },
    CaptureCancelled { step: String },
    JobFailed { job: String, error: String },
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModeOneStarted { workers } => {
                write!(f, "Mode One started ({} active items)", workers)
            }
            Self::ModeOneStopped => write!(f, "Mode One stopped"),
            Self::ModeTwoStarted => write!(f, "Mode Two started"),
            Self::ModeTwoStopped => write!(f, "Mode Two stopped"),
            Self::AboveThreshold {
                target,
                price,
                threshold,
            } => write!(f, "{}: price {} above threshold {}", target, price, threshold),
            Self::BelowThreshold {
                target,
                price,
                threshold,
            } => write!(f, "{}: price {} below threshold {}", target, price, threshold),
            Self::MissingAnchor { target, role } => {
                write!(f, "{}: missing anchor '{}', no action taken", target, role)
            }
            Self::ConfigIncomplete { target, detail } => {
                write!(f, "{}: configuration incomplete ({})", target, detail)
            }
            Self::ConfirmationFailed {
                target,
                price,
                threshold,
            } => match price {
                Some(price) => write!(
                    f,
                    "{}: confirmation failed, price rose to {} (threshold {})",
                    target, price, threshold
                ),
                None => write!(f, "{}: confirmation failed, price unreadable", target),
            },
            Self::Executed { target } => write!(f, "{}: purchase executed", target),
            Self::MacroExecuted { branch, events } => {
                write!(f, "Executed {} macro ({} events)", branch, events)
            }
            Self::TerminationMatched { color } => {
                write!(f, "Termination color {} matched, Mode Two stopping", color)
            }
            Self::WorkerExited { target } => {
                write!(f, "{}: removed or deactivated, watch ended", target)
            }
            Self::TickFailed { target, error } => write!(f, "{}: tick failed: {}", target, error),
            Self::RecordingCountdown { remaining_secs } => {
                write!(f, "Recording starts in {}...", remaining_secs)
            }
            Self::RecordingStarted { stop_key } => {
                write!(f, "Recording, press {} to stop", stop_key)
            }
            Self::RecordingSaved { path, events } => {
                write!(f, "Recorded {} events to {}", events, path.display())
            }
            Self::RecordingCancelled => write!(f, "Recording cancelled"),
            Self::CapturePrompt { step } => write!(f, "Capture: {}", step),
            Self::CaptureCancelled { step } => write!(f, "Capture cancelled: {}", step),
            Self::JobFailed { job, error } => write!(f, "{} failed: {}", job, error),
        }
    }
}

/// Logs each event and forwards it to the presentation layer.
#[derive(Clone)]
pub struct StatusReporter {
    tx: Sender<StatusEvent>,
}

impl StatusReporter {
    pub fn channel() -> (Self, Receiver<StatusEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: StatusEvent) {
        info!("{}", event);
        // The receiver may be gone during shutdown
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_forwards() {
        let (reporter, rx) = StatusReporter::channel();
        reporter.emit(StatusEvent::Executed {
            target: "ammo".into(),
        });
        assert_eq!(
            rx.try_recv().unwrap(),
            StatusEvent::Executed {
                target: "ammo".into()
            }
        );
    }

    #[test]
    fn test_emit_without_receiver() {
        let (reporter, rx) = StatusReporter::channel();
        drop(rx);
        reporter.emit(StatusEvent::ModeOneStopped);
    }

    #[test]
    fn test_display_text() {
        let event = StatusEvent::BelowThreshold {
            target: "ammo".into(),
            price: 95.0,
            threshold: 100.0,
        };
        assert_eq!(event.to_string(), "ammo: price 95 below threshold 100");

        let failed = StatusEvent::ConfirmationFailed {
            target: "ammo".into(),
            price: Some(120.0),
            threshold: 100.0,
        };
        assert!(failed.to_string().contains("confirmation failed"));
    }
}
