//! GUI application state.
//!
//! Holds form inputs, the status log and the background job indicator.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::automation::{StatusEvent, StopSignal};

/// Maximum status lines kept for display.
const STATUS_LOG_CAPACITY: usize = 500;

/// Severity used to color a status line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Warning,
    Error,
}

impl StatusKind {
    pub fn of(event: &StatusEvent) -> Self {
        match event {
            StatusEvent::Executed { .. }
            | StatusEvent::TerminationMatched { .. }
            | StatusEvent::RecordingSaved { .. } => Self::Success,
            StatusEvent::MissingAnchor { .. }
            | StatusEvent::ConfigIncomplete { .. }
            | StatusEvent::ConfirmationFailed { .. }
            | StatusEvent::CaptureCancelled { .. }
            | StatusEvent::RecordingCancelled => Self::Warning,
            StatusEvent::TickFailed { .. } | StatusEvent::JobFailed { .. } => Self::Error,
            _ => Self::Info,
        }
    }
}

#[derive(Clone, Debug)]
pub struct StatusLine {
    pub time: String,
    pub text: String,
    pub kind: StatusKind,
}

/// A capture or recording running off the UI thread.
pub struct BackgroundJob {
    pub label: String,
    pub stop: StopSignal,
    pub done: Arc<AtomicBool>,
}

impl BackgroundJob {
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }
}

/// Which macro a recording is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MacroSlot {
    Above,
    Below,
}

impl MacroSlot {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Above => "above_threshold.json",
            Self::Below => "below_threshold.json",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Above => "above-threshold",
            Self::Below => "below-threshold",
        }
    }
}

pub struct GuiState {
    /// Name typed for a new watch item.
    pub new_item_name: String,
    /// Threshold typed for a new watch item.
    pub new_item_threshold: f64,
    /// Probe color being edited as "r,g,b".
    pub probe_color_text: String,
    pub status_log: VecDeque<StatusLine>,
    pub job: Option<BackgroundJob>,
}

impl Default for GuiState {
    fn default() -> Self {
        Self {
            new_item_name: String::new(),
            new_item_threshold: 100.0,
            probe_color_text: String::new(),
            status_log: VecDeque::with_capacity(STATUS_LOG_CAPACITY),
            job: None,
        }
    }
}

impl GuiState {
    pub fn push_status(&mut self, event: &StatusEvent) {
        if self.status_log.len() == STATUS_LOG_CAPACITY {
            self.status_log.pop_front();
        }
        self.status_log.push_back(StatusLine {
            time: chrono::Local::now().format("%H:%M:%S").to_string(),
            text: event.to_string(),
            kind: StatusKind::of(event),
        });
    }

    pub fn is_busy(&self) -> bool {
        self.job.as_ref().is_some_and(|job| !job.is_done())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_log_is_capped() {
        let mut state = GuiState::default();
        for _ in 0..STATUS_LOG_CAPACITY + 5 {
            state.push_status(&StatusEvent::ModeOneStopped);
        }
        assert_eq!(state.status_log.len(), STATUS_LOG_CAPACITY);
    }

    #[test]
    fn test_status_kind() {
        let executed = StatusEvent::Executed {
            target: "ammo".into(),
        };
        assert_eq!(StatusKind::of(&executed), StatusKind::Success);
        assert_eq!(StatusKind::of(&StatusEvent::RecordingCancelled), StatusKind::Warning);
        assert_eq!(StatusKind::of(&StatusEvent::ModeOneStopped), StatusKind::Info);
    }

    #[test]
    fn test_finished_job_is_not_busy() {
        let mut state = GuiState::default();
        let done = Arc::new(AtomicBool::new(false));
        state.job = Some(BackgroundJob {
            label: "Record".into(),
            stop: StopSignal::new(),
            done: done.clone(),
        });
        assert!(state.is_busy());
        done.store(true, Ordering::SeqCst);
        assert!(!state.is_busy());
    }
}
