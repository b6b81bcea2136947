//! Fan-out of raw input events.
//!
//! The global hook publishes every pointer and keyboard event here. The macro
//! recorder and the capture service subscribe for as long as they need input;
//! dropping an `InputSubscription` detaches it.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{KeyName, MouseButton};
use crate::session::Coordinate;

#[derive(Clone, Debug, PartialEq)]
pub enum RawInput {
    PointerMoved(Coordinate),
    ButtonPressed { at: Coordinate, button: MouseButton },
    ButtonReleased { at: Coordinate, button: MouseButton },
    KeyPressed(KeyName),
    KeyReleased(KeyName),
}

#[derive(Default)]
struct HubInner {
    next_id: u64,
    subscribers: Vec<(u64, Sender<RawInput>)>,
    pointer: Option<Coordinate>,
}

#[derive(Clone, Default)]
pub struct InputHub {
    inner: Arc<Mutex<HubInner>>,
}

impl InputHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every live subscriber.
    pub fn publish(&self, event: RawInput) {
        let mut inner = self.lock();
        match &event {
            RawInput::PointerMoved(at)
            | RawInput::ButtonPressed { at, .. }
            | RawInput::ButtonReleased { at, .. } => inner.pointer = Some(*at),
            _ => {}
        }
        inner
            .subscribers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    pub fn subscribe(&self) -> InputSubscription {
        let (tx, rx) = mpsc::channel();
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, tx));
        InputSubscription {
            id,
            rx,
            hub: self.clone(),
        }
    }

    /// Last pointer position seen by the hook.
    pub fn pointer_position(&self) -> Option<Coordinate> {
        self.lock().pointer
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn unsubscribe(&self, id: u64) {
        self.lock().subscribers.retain(|(sub_id, _)| *sub_id != id);
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A live feed of raw input. Unsubscribes on drop.
pub struct InputSubscription {
    id: u64,
    rx: Receiver<RawInput>,
    hub: InputHub,
}

impl InputSubscription {
    /// Waits up to `timeout` for the next event. `None` on timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<RawInput> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv(&self) -> Option<RawInput> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Discards everything queued so far.
    pub fn drain(&self) {
        while self.try_recv().is_some() {}
    }

    pub fn pointer_position(&self) -> Option<Coordinate> {
        self.hub.pointer_position()
    }
}

impl Drop for InputSubscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}
