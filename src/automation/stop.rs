//! Cooperative stop flag for watch loops and recording sessions.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// A shared stop request that sleeping threads can wait on.
///
/// Loops check it at tick boundaries and use `wait` for their interval sleep,
/// so a stop request ends the sleep early but never interrupts a tick.
#[derive(Clone, Default)]
pub struct StopSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        let (lock, cvar) = &*self.inner;
        *Self::guard(lock) = true;
        cvar.notify_all();
    }

    pub fn reset(&self) {
        *Self::guard(&self.inner.0) = false;
    }

    pub fn is_requested(&self) -> bool {
        *Self::guard(&self.inner.0)
    }

    /// Sleeps up to `timeout`. Returns `true` if a stop was requested.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut stopped = Self::guard(lock);
        while !*stopped {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            stopped = match cvar.wait_timeout(stopped, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }

    fn guard(lock: &Mutex<bool>) -> MutexGuard<'_, bool> {
        lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
