//! Interactive coordinate capture.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::coords::cursor_position;
use super::overlay::{Overlay, OverlayGuard};
use super::protocol::{CaptureOutcome, CaptureProtocol};
use super::state::CaptureStep;
use crate::automation::{StatusEvent, StatusReporter, StopSignal};
use crate::input::{InputHub, InputSubscription, KeyName};
use crate::session::{AnchorRole, Coordinate, Region, SessionStore, WatchItem};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Resolves operator pointing into coordinates, one capture at a time.
pub struct CoordinateCaptureService {
    hub: InputHub,
    overlay: Arc<dyn Overlay>,
    store: SessionStore,
    reporter: StatusReporter,
}

impl CoordinateCaptureService {
    pub fn new(
        hub: InputHub,
        overlay: Arc<dyn Overlay>,
        store: SessionStore,
        reporter: StatusReporter,
    ) -> Self {
        Self {
            hub,
            overlay,
            store,
            reporter,
        }
    }

    /// Shows the overlay and blocks until the step is resolved.
    ///
    /// Input during the arm delay is discarded. Returns `None` on cancel,
    /// including a request on `stop`.
    pub fn capture(&self, step: &CaptureStep, stop: &StopSignal) -> Result<Option<Coordinate>> {
        let engine = self.store.snapshot().engine;
        let mut protocol =
            CaptureProtocol::new(engine.capture_confirm_key.clone(), engine.capture_cancel_key.clone());

        self.reporter.emit(StatusEvent::CapturePrompt {
            step: prompt_text(step, &engine.capture_confirm_key, &engine.capture_cancel_key),
        });

        let subscription = self.hub.subscribe();
        let overlay = OverlayGuard::show(self.overlay.as_ref(), &step.description())?;

        let outcome = if stop.wait(Duration::from_millis(engine.capture_arm_delay_ms)) {
            CaptureOutcome::Cancelled
        } else {
            subscription.drain();
            debug!("Capture armed: {}", step);
            wait_for_outcome(&subscription, &mut protocol, stop)
        };
        drop(overlay);
        drop(subscription);

        match outcome {
            CaptureOutcome::Point(at) => info!("Captured {}: {}", step, at),
            CaptureOutcome::Cancelled => self.reporter.emit(StatusEvent::CaptureCancelled {
                step: step.description(),
            }),
        }
        Ok(outcome.point())
    }

    /// Captures `role` and stores it. `None` if cancelled; the anchor is untouched.
    pub fn capture_anchor(&self, role: AnchorRole, stop: &StopSignal) -> Result<Option<Coordinate>> {
        let Some(at) = self.capture(&CaptureStep::Anchor(role), stop)? else {
            return Ok(None);
        };
        self.store.update_anchor(role, at)?;
        Ok(Some(at))
    }

    /// Captures every unset anchor in order. Stops at the first cancel.
    ///
    /// Returns the roles that were captured.
    pub fn capture_missing_anchors(&self, stop: &StopSignal) -> Result<Vec<AnchorRole>> {
        let missing = self.store.snapshot().anchors.missing();
        let mut captured = Vec::new();
        for role in missing {
            if self.capture_anchor(role, stop)?.is_none() {
                break;
            }
            captured.push(role);
        }
        Ok(captured)
    }

    /// Captures two corners and builds a region from them.
    ///
    /// Cancelling either corner returns `None`. Corners that do not form a
    /// top-left/bottom-right pair are an error.
    pub fn capture_region(&self, stop: &StopSignal) -> Result<Option<Region>> {
        let Some(top_left) = self.capture(&CaptureStep::RegionTopLeft, stop)? else {
            return Ok(None);
        };
        let Some(bottom_right) = self.capture(&CaptureStep::RegionBottomRight, stop)? else {
            return Ok(None);
        };
        let region = Region::from_corners(top_left, bottom_right)?;
        info!("Captured region {}", region);
        Ok(Some(region))
    }

    /// Captures the Mode Two price region and stores it.
    pub fn capture_monitor_region(&self, stop: &StopSignal) -> Result<Option<Region>> {
        let Some(region) = self.capture_region(stop)? else {
            return Ok(None);
        };
        self.store
            .update_mode_two(|monitor| monitor.price_region = Some(region))?;
        Ok(Some(region))
    }

    /// Captures the termination pixel and stores it.
    pub fn capture_termination_probe(&self, stop: &StopSignal) -> Result<Option<Coordinate>> {
        let Some(at) = self.capture(&CaptureStep::TerminationProbe, stop)? else {
            return Ok(None);
        };
        self.store
            .update_mode_two(|monitor| monitor.termination.coordinate = Some(at))?;
        Ok(Some(at))
    }

    /// Captures the price location for a new or existing watch item.
    pub fn capture_watch_item(
        &self,
        name: &str,
        threshold: f64,
        stop: &StopSignal,
    ) -> Result<Option<WatchItem>> {
        let Some(at) = self.capture(&CaptureStep::WatchItem(name.to_string()), stop)? else {
            return Ok(None);
        };
        let snapshot = self.store.snapshot();
        let item = match snapshot.mode_one.item(name) {
            Some(existing) => WatchItem {
                coordinate: at,
                threshold,
                ..existing.clone()
            },
            None => {
                let mut item = WatchItem::new(name, at, threshold);
                item.poll_interval_ms = snapshot.mode_one.poll_interval_ms;
                item
            }
        };
        self.store.upsert_item(item.clone())?;
        Ok(Some(item))
    }
}

fn wait_for_outcome(
    subscription: &InputSubscription,
    protocol: &mut CaptureProtocol,
    stop: &StopSignal,
) -> CaptureOutcome {
    while !stop.is_requested() {
        let Some(event) = subscription.recv_timeout(POLL_INTERVAL) else {
            continue;
        };
        let pointer = subscription.pointer_position().or_else(cursor_position);
        if let Some(outcome) = protocol.handle(&event, pointer) {
            return outcome;
        }
    }
    CaptureOutcome::Cancelled
}

fn prompt_text(step: &CaptureStep, confirm: &KeyName, cancel: &KeyName) -> String {
    format!(
        "{}: click it, or hover and press {} ({} cancels)",
        step.description(),
        confirm.as_str().to_uppercase(),
        cancel.as_str().to_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::overlay::NoOverlay;
    use crate::input::{MouseButton, RawInput};
    use crate::session::SessionConfig;
    use std::sync::mpsc::Receiver;
    use std::thread;
    use std::time::Instant;

    fn service() -> (CoordinateCaptureService, InputHub, Receiver<StatusEvent>) {
        let mut config = SessionConfig::default();
        config.engine.capture_arm_delay_ms = 20;
        let hub = InputHub::new();
        let (reporter, rx) = StatusReporter::channel();
        let svc = CoordinateCaptureService::new(
            hub.clone(),
            Arc::new(NoOverlay),
            SessionStore::in_memory(config),
            reporter,
        );
        (svc, hub, rx)
    }

    /// Publishes `events` once the capture has subscribed and armed.
    fn feed(hub: &InputHub, rx: &Receiver<StatusEvent>, events: Vec<RawInput>) -> thread::JoinHandle<()> {
        // Wait for the prompt, which is emitted right before subscribing
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Ok(StatusEvent::CapturePrompt { .. }) = rx.recv_timeout(Duration::from_millis(50)) {
                break;
            }
        }
        let hub = hub.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            for event in events {
                hub.publish(event);
            }
        })
    }

    fn click(x: i32, y: i32) -> Vec<RawInput> {
        let at = Coordinate::new(x, y);
        vec![
            RawInput::ButtonPressed {
                at,
                button: MouseButton::Left,
            },
            RawInput::ButtonReleased {
                at,
                button: MouseButton::Left,
            },
        ]
    }

    #[test]
    fn test_capture_anchor_updates_store() {
        let (svc, hub, rx) = service();
        thread::scope(|s| {
            let capture = s.spawn(|| svc.capture_anchor(AnchorRole::PurchaseButton, &StopSignal::new()));
            feed(&hub, &rx, click(300, 400)).join().unwrap();
            assert_eq!(
                capture.join().unwrap().unwrap(),
                Some(Coordinate::new(300, 400))
            );
        });
        assert_eq!(
            svc.store.snapshot().anchors.get(AnchorRole::PurchaseButton),
            Some(Coordinate::new(300, 400))
        );
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_cancel_leaves_anchor_unset() {
        let (svc, hub, rx) = service();
        thread::scope(|s| {
            let capture = s.spawn(|| svc.capture_anchor(AnchorRole::MainTab, &StopSignal::new()));
            feed(&hub, &rx, vec![RawInput::KeyPressed(KeyName::new("esc"))])
                .join()
                .unwrap();
            assert_eq!(capture.join().unwrap().unwrap(), None);
        });
        assert_eq!(svc.store.snapshot().anchors.get(AnchorRole::MainTab), None);
        assert!(rx.try_iter().any(|e| matches!(e, StatusEvent::CaptureCancelled { .. })));
    }

    #[test]
    fn test_confirm_key_captures_pointer() {
        let (svc, hub, rx) = service();
        thread::scope(|s| {
            let capture = s.spawn(|| svc.capture(&CaptureStep::TerminationProbe, &StopSignal::new()));
            feed(
                &hub,
                &rx,
                vec![
                    RawInput::PointerMoved(Coordinate::new(11, 22)),
                    RawInput::KeyPressed(KeyName::new("f8")),
                ],
            )
            .join()
            .unwrap();
            assert_eq!(
                capture.join().unwrap().unwrap(),
                Some(Coordinate::new(11, 22))
            );
        });
    }

    #[test]
    fn test_capture_region_from_two_corners() {
        let (svc, hub, rx) = service();
        thread::scope(|s| {
            let capture = s.spawn(|| svc.capture_region(&StopSignal::new()));
            feed(&hub, &rx, click(100, 100)).join().unwrap();
            feed(&hub, &rx, click(260, 170)).join().unwrap();
            let region = capture.join().unwrap().unwrap().unwrap();
            assert_eq!(region.left(), 100);
            assert_eq!(region.top(), 100);
            assert_eq!(region.width(), 160);
            assert_eq!(region.height(), 70);
        });
    }

    #[test]
    fn test_capture_watch_item_keeps_settings() {
        let (svc, hub, rx) = service();
        let mut existing = WatchItem::new("ammo", Coordinate::new(1, 1), 10.0);
        existing.poll_interval_ms = 250;
        existing.active = false;
        svc.store.upsert_item(existing).unwrap();

        thread::scope(|s| {
            let capture = s.spawn(|| svc.capture_watch_item("ammo", 80.0, &StopSignal::new()));
            feed(&hub, &rx, click(640, 480)).join().unwrap();
            capture.join().unwrap().unwrap();
        });

        let config = svc.store.snapshot();
        assert_eq!(config.mode_one.items.len(), 1);
        let item = config.mode_one.item("ammo").unwrap();
        assert_eq!(item.coordinate, Coordinate::new(640, 480));
        assert_eq!(item.threshold, 80.0);
        assert_eq!(item.poll_interval_ms, 250);
        assert!(!item.active);
    }

    #[test]
    fn test_capture_termination_probe_updates_monitor() {
        let (svc, hub, rx) = service();
        thread::scope(|s| {
            let capture = s.spawn(|| svc.capture_termination_probe(&StopSignal::new()));
            feed(&hub, &rx, click(5, 6)).join().unwrap();
            capture.join().unwrap().unwrap();
        });
        assert_eq!(
            svc.store.snapshot().mode_two.termination.coordinate,
            Some(Coordinate::new(5, 6))
        );
    }

    #[test]
    fn test_stop_request_cancels_capture() {
        let (svc, hub, rx) = service();
        let stop = StopSignal::new();
        thread::scope(|s| {
            let capture = s.spawn(|| svc.capture_anchor(AnchorRole::PurchaseButton, &stop));
            feed(&hub, &rx, Vec::new()).join().unwrap();
            stop.request();
            assert_eq!(capture.join().unwrap().unwrap(), None);
        });
        assert_eq!(svc.store.snapshot().anchors.get(AnchorRole::PurchaseButton), None);
        assert!(rx.try_iter().any(|e| matches!(e, StatusEvent::CaptureCancelled { .. })));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_stop_during_arm_delay_cancels() {
        let (svc, _hub, _rx) = service();
        let stop = StopSignal::new();
        stop.request();
        assert_eq!(svc.capture(&CaptureStep::TerminationProbe, &stop).unwrap(), None);
    }

    #[test]
    fn test_prompt_names_keys() {
        let text = prompt_text(
            &CaptureStep::Anchor(AnchorRole::TradeEntry),
            &KeyName::new("f8"),
            &KeyName::new("esc"),
        );
        assert!(text.starts_with("Trade entry button"));
        assert!(text.contains("F8"));
        assert!(text.contains("ESC"));
    }
}
