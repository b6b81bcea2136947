//! Mode One: per-item watch with a confirm-before-purchase step.
//!
//! Each active watch item gets its own worker thread. A tick reads the price
//! near the item, and at or below the threshold clicks max-quantity, re-reads
//! the price after a settle delay and only then clicks purchase.

use anyhow::Result;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::probe::read_price;
use super::status::{StatusEvent, StatusReporter};
use super::stop::StopSignal;
use super::panic_message;
use crate::input::MouseButton;
use crate::services::Services;
use crate::session::{AnchorRole, ConfigError, Region, SessionConfig, SessionStore, WatchItem};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemState {
    Idle,
    Polling,
    ConfirmPending,
    Acted,
}

/// What a single tick did.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    NoReading,
    AboveThreshold,
    MissingAnchor(AnchorRole),
    ConfirmationFailed,
    Executed,
}

/// Per-item state, shared between workers and the presentation layer.
#[derive(Clone, Default)]
pub struct ItemStates {
    inner: Arc<Mutex<HashMap<String, ItemState>>>,
}

impl ItemStates {
    pub fn get(&self, name: &str) -> ItemState {
        self.lock().get(name).copied().unwrap_or(ItemState::Idle)
    }

    fn set(&self, name: &str, state: ItemState) {
        self.lock().insert(name.to_string(), state);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ItemState>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Runs one poll-decide-act cycle for `item` against a session snapshot.
pub fn run_tick(
    item: &WatchItem,
    config: &SessionConfig,
    services: &Services,
    reporter: &StatusReporter,
    states: &ItemStates,
) -> Result<TickOutcome> {
    let target = item.name.as_str();
    states.set(target, ItemState::Polling);

    let Some(price) = read_price(services, item.price_region())? else {
        debug!("{}: no price decoded", target);
        return Ok(TickOutcome::NoReading);
    };

    if price > item.threshold {
        reporter.emit(StatusEvent::AboveThreshold {
            target: target.to_string(),
            price,
            threshold: item.threshold,
        });
        return Ok(TickOutcome::AboveThreshold);
    }

    reporter.emit(StatusEvent::BelowThreshold {
        target: target.to_string(),
        price,
        threshold: item.threshold,
    });
    states.set(target, ItemState::ConfirmPending);

    let anchors = &config.anchors;
    let buttons = anchors.require(AnchorRole::MaxQuantityButton).and_then(|max_quantity| {
        anchors
            .require(AnchorRole::PurchaseButton)
            .map(|purchase| (max_quantity, purchase))
    });
    let (max_quantity, purchase) = match buttons {
        Ok(buttons) => buttons,
        Err(ConfigError::MissingAnchor(role)) => {
            reporter.emit(StatusEvent::MissingAnchor {
                target: target.to_string(),
                role,
            });
            states.set(target, ItemState::Polling);
            return Ok(TickOutcome::MissingAnchor(role));
        }
        Err(e) => return Err(e.into()),
    };

    services.input.click(max_quantity, MouseButton::Left)?;
    thread::sleep(Duration::from_millis(config.engine.settle_delay_ms));

    let confirmation = match config.anchors.get(AnchorRole::PriceSecondary) {
        Some(anchor) => read_price(services, Region::around(anchor))?,
        None => Some(price),
    };

    match confirmation {
        Some(confirmed) if confirmed <= item.threshold => {
            services.input.click(purchase, MouseButton::Left)?;
            states.set(target, ItemState::Acted);
            reporter.emit(StatusEvent::Executed {
                target: target.to_string(),
            });
            Ok(TickOutcome::Executed)
        }
        other => {
            reporter.emit(StatusEvent::ConfirmationFailed {
                target: target.to_string(),
                price: other,
                threshold: item.threshold,
            });
            states.set(target, ItemState::Polling);
            Ok(TickOutcome::ConfirmationFailed)
        }
    }
}

/// Starts and stops the per-item workers.
///
/// Counts as running while at least one worker is alive. When the last
/// worker exits on its own the controller can be started again.
pub struct ModeOneController {
    store: SessionStore,
    services: Services,
    reporter: StatusReporter,
    stop: StopSignal,
    running: Arc<AtomicBool>,
    live: Arc<AtomicUsize>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    states: ItemStates,
}

impl ModeOneController {
    pub fn new(store: SessionStore, services: Services, reporter: StatusReporter) -> Self {
        Self {
            store,
            services,
            reporter,
            stop: StopSignal::new(),
            running: Arc::new(AtomicBool::new(false)),
            live: Arc::new(AtomicUsize::new(0)),
            workers: Mutex::new(Vec::new()),
            states: ItemStates::default(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn states(&self) -> &ItemStates {
        &self.states
    }

    /// Spawns a worker for every active item. No-op while already running.
    ///
    /// Returns the number of workers started.
    pub fn start(&self) -> usize {
        let mut workers = self.lock_workers();
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Mode One already running");
            return 0;
        }

        let names: Vec<String> = self
            .store
            .snapshot()
            .mode_one
            .items
            .into_iter()
            .filter(|item| item.active)
            .map(|item| item.name)
            .collect();

        if names.is_empty() {
            self.running.store(false, Ordering::SeqCst);
            info!("Mode One has no active items");
            return 0;
        }

        // Handles left by workers that exited on their own
        workers.retain(|handle| !handle.is_finished());
        self.stop.reset();

        for name in &names {
            self.live.fetch_add(1, Ordering::SeqCst);
            let worker = ItemWorker {
                name: name.clone(),
                store: self.store.clone(),
                services: self.services.clone(),
                reporter: self.reporter.clone(),
                stop: self.stop.clone(),
                states: self.states.clone(),
                _live: LiveWorker {
                    live: self.live.clone(),
                    running: self.running.clone(),
                },
            };
            self.states.set(name, ItemState::Polling);
            workers.push(thread::spawn(move || worker.run()));
        }

        self.reporter.emit(StatusEvent::ModeOneStarted {
            workers: names.len(),
        });
        names.len()
    }

    /// Requests a stop and waits for every worker to finish its current tick.
    pub fn stop(&self) {
        let workers: Vec<JoinHandle<()>> = {
            let mut workers = self.lock_workers();
            if !self.is_running() {
                workers.clear();
                return;
            }
            self.stop.request();
            workers.drain(..).collect()
        };

        for handle in workers {
            if handle.join().is_err() {
                warn!("Mode One worker terminated abnormally");
            }
        }
        self.reporter.emit(StatusEvent::ModeOneStopped);
    }

    fn lock_workers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ModeOneController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Held by each worker; the last one to drop clears the running flag.
struct LiveWorker {
    live: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
}

impl Drop for LiveWorker {
    fn drop(&mut self) {
        if self.live.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.running.store(false, Ordering::SeqCst);
        }
    }
}

struct ItemWorker {
    name: String,
    store: SessionStore,
    services: Services,
    reporter: StatusReporter,
    stop: StopSignal,
    states: ItemStates,
    _live: LiveWorker,
}

impl ItemWorker {
    fn run(self) {
        info!("Watching '{}'", self.name);

        while !self.stop.is_requested() {
            let config = self.store.snapshot();
            let Some(item) = config
                .mode_one
                .item(&self.name)
                .filter(|item| item.active)
                .cloned()
            else {
                self.reporter.emit(StatusEvent::WorkerExited {
                    target: self.name.clone(),
                });
                break;
            };

            self.tick(&item, &config);

            if self.stop.wait(Duration::from_millis(item.poll_interval_ms)) {
                break;
            }
        }

        self.states.set(&self.name, ItemState::Idle);
        info!("Stopped watching '{}'", self.name);
    }

/// Runs one tick, reporting errors and panics instead of propagating them.
    fn tick(&self, item: &WatchItem, config: &SessionConfig) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            run_tick(item, config, &self.services, &self.reporter, &self.states)
        }));

        let error = match result {
            Ok(Ok(_)) => return,
            Ok(Err(e)) => format!("{:#}", e),
            Err(payload) => format!("panic: {}", panic_message(payload.as_ref())),
        };
        error!("{}: tick failed: {}", self.name, error);
        self.states.set(&self.name, ItemState::Polling);
        self.reporter.emit(StatusEvent::TickFailed {
            target: self.name.clone(),
            error,
        });
    }
}
