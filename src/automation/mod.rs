//! Price-watch automation.
//!
//! This module provides:
//! - Mode One: one worker per watch item, confirm-before-purchase
//! - Mode Two: threshold branch into recorded macros, color-probe termination
//! - The status channel and the cooperative stop signal both modes share

pub mod mode_one;
pub mod mode_two;
pub mod probe;
pub mod status;
pub mod stop;

use std::any::Any;

pub use mode_one::{ItemState, ModeOneController};
pub use mode_two::{BranchScripts, ModeTwoController, MonitorState};
pub use status::{Branch, StatusEvent, StatusReporter};
pub use stop::StopSignal;

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
