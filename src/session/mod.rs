//! Session state: anchors, watch items, the Mode Two monitor and engine settings.
//!
//! This module provides:
//! - Screen primitives (`Coordinate`, `Region`, `Color`)
//! - The named anchor slots used by Mode One
//! - The persisted `config.json` document
//! - `SessionStore`, the single writer that persists every mutation

pub mod anchors;
pub mod config;
pub mod store;
pub mod types;

use thiserror::Error;

pub use anchors::{AnchorRole, AnchorSet};
pub use config::{
    EngineSettings, ModeOneConfig, MonitorConfig, SessionConfig, TerminationProbe, WatchItem,
    MIN_POLL_INTERVAL_MS,
};
pub use store::SessionStore;
pub use types::{Color, Coordinate, Region};

/// Invalid or incomplete session configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("region must have a positive size, got {width}x{height}")]
    EmptyRegion { width: u32, height: u32 },

    #[error("bottom-right corner {bottom_right} is not below and right of top-left {top_left}")]
    InvertedCorners {
        top_left: Coordinate,
        bottom_right: Coordinate,
    },

    #[error("anchor not set: {0}")]
    MissingAnchor(AnchorRole),
}
