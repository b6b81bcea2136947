//! What is being captured.

use std::fmt;

use crate::session::AnchorRole;

/// One coordinate the operator is asked to point at.
#[derive(Clone, Debug, PartialEq)]
pub enum CaptureStep {
    Anchor(AnchorRole),
    /// Top-left corner of a region.
    RegionTopLeft,
    /// Bottom-right corner of a region.
    RegionBottomRight,
    /// The Mode Two termination pixel.
    TerminationProbe,
    /// Price location of a Mode One watch item.
    WatchItem(String),
}

impl CaptureStep {
    /// Returns a human-readable description of the step.
    pub fn description(&self) -> String {
        match self {
            Self::Anchor(role) => role.label().to_string(),
            Self::RegionTopLeft => "Price region - TOP-LEFT corner".to_string(),
            Self::RegionBottomRight => "Price region - BOTTOM-RIGHT corner".to_string(),
            Self::TerminationProbe => "Termination pixel".to_string(),
            Self::WatchItem(name) => format!("Price of '{}'", name),
        }
    }
}

impl fmt::Display for CaptureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}
