//! Mode Two: one watched region, two branch macros, a color-probe stop.
//!
//! Above the threshold the above-threshold macro runs. At or below it the
//! below-threshold macro runs and then a single pixel is compared against the
//! expected color; an exact match ends monitoring.

use anyhow::Result;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::panic_message;
use super::probe::{pixel_matches, read_price};
use super::status::{Branch, StatusEvent, StatusReporter};
use super::stop::StopSignal;
use crate::macros::{MacroPlayer, MacroScript};
use crate::services::Services;
use crate::session::{MonitorConfig, SessionStore};

const TARGET: &str = "Mode Two";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
    Terminating,
    /// Ended by the termination probe. Only an explicit start leaves this state.
    Stopped,
}

/// The scripts used by subsequent ticks.
#[derive(Clone, Debug, Default)]
pub struct BranchScripts {
    pub above: Option<Arc<MacroScript>>,
    pub below: Option<Arc<MacroScript>>,
}

impl BranchScripts {
    /// Loads both configured scripts. Unset or missing files load as `None`.
    pub fn load(monitor: &MonitorConfig, base_dir: &Path) -> Result<Self> {
        let load = |path: &Option<PathBuf>| -> Result<Option<Arc<MacroScript>>> {
            match path {
                Some(path) => {
                    let path = base_dir.join(path);
                    let script = MacroScript::load_optional(&path)?;
                    if script.is_none() {
                        warn!("Macro {} does not exist", path.display());
                    }
                    Ok(script.map(Arc::new))
                }
                None => Ok(None),
            }
        };
        Ok(Self {
            above: load(&monitor.above_macro)?,
            below: load(&monitor.below_macro)?,
        })
    }

    fn for_branch(&self, branch: Branch) -> Option<&Arc<MacroScript>> {
        match branch {
            Branch::AboveThreshold => self.above.as_ref(),
            Branch::BelowThreshold => self.below.as_ref(),
        }
    }
}

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorTick {
    NoReading,
    ConfigIncomplete,
    Executed(Branch),
    Terminated,
}

/// Runs one sample-decide-act cycle.
pub fn run_tick(
    monitor: &MonitorConfig,
    scripts: &BranchScripts,
    services: &Services,
    player: &MacroPlayer,
    reporter: &StatusReporter,
) -> Result<MonitorTick> {
    let Some(region) = monitor.price_region else {
        reporter.emit(StatusEvent::ConfigIncomplete {
            target: TARGET.to_string(),
            detail: "no price region".to_string(),
        });
        return Ok(MonitorTick::ConfigIncomplete);
    };

    let Some(price) = read_price(services, region)? else {
        debug!("{}: no price decoded", TARGET);
        return Ok(MonitorTick::NoReading);
    };

    let threshold = monitor.threshold;
    let branch = if price > threshold {
        reporter.emit(StatusEvent::AboveThreshold {
            target: TARGET.to_string(),
            price,
            threshold,
        });
        Branch::AboveThreshold
    } else {
        reporter.emit(StatusEvent::BelowThreshold {
            target: TARGET.to_string(),
            price,
            threshold,
        });
        Branch::BelowThreshold
    };

    let Some(script) = scripts.for_branch(branch) else {
        reporter.emit(StatusEvent::ConfigIncomplete {
            target: TARGET.to_string(),
            detail: format!("no {} macro", branch),
        });
        return Ok(MonitorTick::ConfigIncomplete);
    };

    player.play(script)?;
    reporter.emit(StatusEvent::MacroExecuted {
        branch,
        events: script.len(),
    });

    if branch == Branch::AboveThreshold {
        return Ok(MonitorTick::Executed(branch));
    }

    let probe = &monitor.termination;
    let Some(at) = probe.coordinate else {
        debug!("Termination probe not configured");
        return Ok(MonitorTick::Executed(branch));
    };

    if pixel_matches(services, at, probe.color)? {
        reporter.emit(StatusEvent::TerminationMatched { color: probe.color });
        return Ok(MonitorTick::Terminated);
    }
    Ok(MonitorTick::Executed(branch))
}

/// Runs the Mode Two loop on a background thread.
pub struct ModeTwoController {
    store: SessionStore,
    services: Services,
    player: MacroPlayer,
    reporter: StatusReporter,
    base_dir: PathBuf,
    scripts: Arc<RwLock<BranchScripts>>,
    state: Arc<Mutex<MonitorState>>,
    stop: StopSignal,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ModeTwoController {
    /// Relative macro paths are resolved against `base_dir`.
    pub fn new(
        store: SessionStore,
        services: Services,
        reporter: StatusReporter,
        base_dir: impl Into<PathBuf>,
    ) -> Self {
        let player = MacroPlayer::new(services.input.clone());
        Self {
            store,
            services,
            player,
            reporter,
            base_dir: base_dir.into(),
            scripts: Arc::new(RwLock::new(BranchScripts::default())),
            state: Arc::new(Mutex::new(MonitorState::Idle)),
            stop: StopSignal::new(),
            worker: Mutex::new(None),
        }
    }

    pub fn state(&self) -> MonitorState {
        *lock(&self.state)
    }

    /// Re-reads both macro files for subsequent ticks.
    pub fn reload_scripts(&self) -> Result<()> {
        let monitor = self.store.snapshot().mode_two;
        let scripts = BranchScripts::load(&monitor, &self.base_dir)?;
        info!(
            "Loaded macros: above {} events, below {} events",
            scripts.above.as_ref().map_or(0, |s| s.len()),
            scripts.below.as_ref().map_or(0, |s| s.len())
        );
        *self.scripts.write().unwrap_or_else(|p| p.into_inner()) = scripts;
        Ok(())
    }

    /// Starts monitoring. Returns `false` if already running or not configured.
    ///
    /// Concurrent starts are serialized on the worker slot and only one of
    /// them moves the state to `Running`.
    pub fn start(&self) -> bool {
        let mut worker = lock(&self.worker);
        let previous = {
            let mut state = lock(&self.state);
            if matches!(*state, MonitorState::Running | MonitorState::Terminating) {
                debug!("Mode Two already running");
                return false;
            }
            std::mem::replace(&mut *state, MonitorState::Running)
        };

        if let Err(detail) = self.prepare() {
            *lock(&self.state) = previous;
            self.reporter.emit(StatusEvent::ConfigIncomplete {
                target: TARGET.to_string(),
                detail,
            });
            return false;
        }

        // A worker that terminated on its own has already returned
        if let Some(handle) = worker.take()
            && handle.join().is_err()
        {
            warn!("Mode Two worker terminated abnormally");
        }
        self.stop.reset();

        let monitor = MonitorWorker {
            store: self.store.clone(),
            services: self.services.clone(),
            player: self.player.clone(),
            reporter: self.reporter.clone(),
            scripts: self.scripts.clone(),
            state: self.state.clone(),
            stop: self.stop.clone(),
        };
        *worker = Some(thread::spawn(move || monitor.run()));
        self.reporter.emit(StatusEvent::ModeTwoStarted);
        true
    }

    fn prepare(&self) -> std::result::Result<(), String> {
        if self.store.snapshot().mode_two.price_region.is_none() {
            return Err("no price region".to_string());
        }
        self.reload_scripts().map_err(|e| format!("{:#}", e))
    }

    /// Requests a stop and waits for the current tick to finish.
    pub fn stop(&self) {
        let handle = {
            let mut worker = lock(&self.worker);
            self.stop.request();
            worker.take()
        };
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            warn!("Mode Two worker terminated abnormally");
        }

        let mut state = lock(&self.state);
        if matches!(*state, MonitorState::Running | MonitorState::Terminating) {
            *state = MonitorState::Idle;
            drop(state);
            self.reporter.emit(StatusEvent::ModeTwoStopped);
        }
    }
}

impl Drop for ModeTwoController {
    fn drop(&mut self) {
        self.stop();
    }
}

struct MonitorWorker {
    store: SessionStore,
    services: Services,
    player: MacroPlayer,
    reporter: StatusReporter,
    scripts: Arc<RwLock<BranchScripts>>,
    state: Arc<Mutex<MonitorState>>,
    stop: StopSignal,
}

impl MonitorWorker {
    fn run(self) {
        info!("Mode Two monitoring started");

        while !self.stop.is_requested() {
            let monitor = self.store.snapshot().mode_two;
            let scripts = self
                .scripts
                .read()
                .unwrap_or_else(|p| p.into_inner())
                .clone();

            if self.tick(&monitor, &scripts) == Some(MonitorTick::Terminated) {
                *lock(&self.state) = MonitorState::Terminating;
                self.reporter.emit(StatusEvent::ModeTwoStopped);
                *lock(&self.state) = MonitorState::Stopped;
                return;
            }

            if self.stop.wait(Duration::from_millis(monitor.poll_interval_ms)) {
                break;
            }
        }
        info!("Mode Two monitoring stopped");
    }

    /// `None` if the tick failed; the failure is reported.
    fn tick(&self, monitor: &MonitorConfig, scripts: &BranchScripts) -> Option<MonitorTick> {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            run_tick(monitor, scripts, &self.services, &self.player, &self.reporter)
        }));

        let error = match result {
            Ok(Ok(tick)) => return Some(tick),
            Ok(Err(e)) => format!("{:#}", e),
            Err(payload) => format!("panic: {}", panic_message(payload.as_ref())),
        };
        error!("{}: tick failed: {}", TARGET, error);
        self.reporter.emit(StatusEvent::TickFailed {
            target: TARGET.to_string(),
            error,
        });
        None
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
