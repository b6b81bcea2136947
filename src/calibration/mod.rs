//! Coordinate capture for anchors, regions and probe points.
//!
//! The operator points at a screen element under a dimmed overlay and either
//! clicks it or presses the confirm hotkey. Captures run one at a time; multi-
//! point operations chain them and report each step before it starts.

pub mod coords;
pub mod overlay;
pub mod protocol;
pub mod service;
pub mod state;

pub use overlay::{NoOverlay, Overlay};
#[cfg(windows)]
pub use overlay::ScreenOverlay;
pub use protocol::{CaptureOutcome, CaptureProtocol};
pub use service::CoordinateCaptureService;
pub use state::CaptureStep;
