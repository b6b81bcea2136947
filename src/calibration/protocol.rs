//! Resolution of one capture from a stream of raw input.

use crate::input::{KeyName, RawInput};
use crate::session::Coordinate;

/// How a capture ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureOutcome {
    Point(Coordinate),
    Cancelled,
}

impl CaptureOutcome {
    pub fn point(self) -> Option<Coordinate> {
        match self {
            Self::Point(at) => Some(at),
            Self::Cancelled => None,
        }
    }
}

/// Waits for press-drag-release, the confirm key, or the cancel key.
///
/// A release only counts if its press was also seen, so a button held down
/// while the overlay was arming is ignored.
#[derive(Debug)]
pub struct CaptureProtocol {
    confirm_key: KeyName,
    cancel_key: KeyName,
    pressed: bool,
}

impl CaptureProtocol {
    pub fn new(confirm_key: KeyName, cancel_key: KeyName) -> Self {
        Self {
            confirm_key,
            cancel_key,
            pressed: false,
        }
    }

    /// Feeds one event. `pointer` is the last known pointer position.
    ///
    /// Returns the outcome once the capture is resolved.
    pub fn handle(&mut self, event: &RawInput, pointer: Option<Coordinate>) -> Option<CaptureOutcome> {
        match event {
            RawInput::ButtonPressed { .. } => {
                self.pressed = true;
                None
            }
            RawInput::ButtonReleased { at, .. } if self.pressed => Some(CaptureOutcome::Point(*at)),
            RawInput::KeyPressed(key) if *key == self.cancel_key => Some(CaptureOutcome::Cancelled),
            RawInput::KeyPressed(key) if *key == self.confirm_key => {
                pointer.map(CaptureOutcome::Point)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MouseButton;

    fn protocol() -> CaptureProtocol {
        CaptureProtocol::new(KeyName::new("f8"), KeyName::new("esc"))
    }

    fn press(x: i32, y: i32) -> RawInput {
        RawInput::ButtonPressed {
            at: Coordinate::new(x, y),
            button: MouseButton::Left,
        }
    }

    fn release(x: i32, y: i32) -> RawInput {
        RawInput::ButtonReleased {
            at: Coordinate::new(x, y),
            button: MouseButton::Left,
        }
    }

    #[test]
    fn test_drag_resolves_to_release_point() {
        let mut p = protocol();
        assert_eq!(p.handle(&press(10, 10), None), None);
        assert_eq!(p.handle(&RawInput::PointerMoved(Coordinate::new(50, 60)), None), None);
        assert_eq!(
            p.handle(&release(100, 120), None),
            Some(CaptureOutcome::Point(Coordinate::new(100, 120)))
        );
    }

    #[test]
    fn test_release_without_press_is_ignored() {
        let mut p = protocol();
        assert_eq!(p.handle(&release(5, 5), None), None);
    }

    #[test]
    fn test_confirm_key_uses_pointer() {
        let mut p = protocol();
        let confirm = RawInput::KeyPressed(KeyName::new("F8"));
        assert_eq!(p.handle(&confirm, None), None);
        assert_eq!(
            p.handle(&confirm, Some(Coordinate::new(7, 8))),
            Some(CaptureOutcome::Point(Coordinate::new(7, 8)))
        );
    }

    #[test]
    fn test_cancel_key() {
        let mut p = protocol();
        p.handle(&press(1, 1), None);
        assert_eq!(
            p.handle(&RawInput::KeyPressed(KeyName::new("escape")), None),
            Some(CaptureOutcome::Cancelled)
        );
    }

    #[test]
    fn test_other_keys_ignored() {
        let mut p = protocol();
        assert_eq!(p.handle(&RawInput::KeyPressed(KeyName::new("a")), Some(Coordinate::new(1, 1))), None);
        assert_eq!(p.handle(&RawInput::KeyReleased(KeyName::new("esc")), None), None);
    }
}
