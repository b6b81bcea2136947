//! GUI module for the application.
//!
//! Provides the operator window using egui/eframe. The UI thread only edits
//! the session, starts and stops controllers, and drains status events.
//! Captures and recordings run on background threads.

pub mod render;
pub mod state;

use anyhow::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

use eframe::egui::{self, Vec2};

use crate::automation::{ModeOneController, ModeTwoController, StatusEvent, StatusReporter, StopSignal};
use crate::calibration::CoordinateCaptureService;
use crate::input::InputHub;
use crate::macros::{record_macro, RecordingRequest};
use crate::session::SessionStore;

use render::Action;
use state::{BackgroundJob, GuiState, MacroSlot};

/// Everything the window needs, built once in `main`.
pub struct AppContext {
    pub store: SessionStore,
    pub hub: InputHub,
    pub reporter: StatusReporter,
    pub status_rx: Receiver<StatusEvent>,
    pub mode_one: Arc<ModeOneController>,
    pub mode_two: Arc<ModeTwoController>,
    pub capture: Arc<CoordinateCaptureService>,
    /// Base for relative macro paths.
    pub base_dir: PathBuf,
}

/// Main GUI application struct.
pub struct GuiApp {
    ctx: AppContext,
    state: GuiState,
}

impl GuiApp {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            state: GuiState::default(),
        }
    }

    fn drain_status(&mut self) {
        while let Ok(event) = self.ctx.status_rx.try_recv() {
            self.state.push_status(&event);
        }
    }

    /// Runs `task` on a background thread, reporting failure as status.
    fn spawn_job<F>(&mut self, label: impl Into<String>, task: F)
    where
        F: FnOnce(StopSignal) -> Result<()> + Send + 'static,
    {
        if self.state.is_busy() {
            warn!("GUI: Another capture or recording is in progress");
            return;
        }

        let label = label.into();
        let stop = StopSignal::new();
        let done = Arc::new(AtomicBool::new(false));
        self.state.job = Some(BackgroundJob {
            label: label.clone(),
            stop: stop.clone(),
            done: done.clone(),
        });

        let reporter = self.ctx.reporter.clone();
        thread::spawn(move || {
            if let Err(e) = task(stop) {
                error!("{} failed: {:#}", label, e);
                reporter.emit(StatusEvent::JobFailed {
                    job: label,
                    error: format!("{:#}", e),
                });
            }
            done.store(true, Ordering::SeqCst);
        });
    }

    fn cancel_job(&mut self) {
        if let Some(job) = &self.state.job {
            job.stop.request();
        }
    }

    fn apply(&mut self, action: Action) {
        let store = self.ctx.store.clone();
        let capture = self.ctx.capture.clone();

        let result = match action {
            Action::StartModeOne => {
                self.ctx.mode_one.start();
                Ok(())
            }
            Action::StopModeOne => {
                let mode_one = self.ctx.mode_one.clone();
                thread::spawn(move || mode_one.stop());
                Ok(())
            }
            Action::AddItem => {
                let name = self.state.new_item_name.trim().to_string();
                let threshold = self.state.new_item_threshold;
                self.state.new_item_name.clear();
                self.spawn_job(format!("Capture '{}'", name), move |stop| {
                    capture.capture_watch_item(&name, threshold, &stop).map(|_| ())
                });
                Ok(())
            }
            Action::RecaptureItem(name) => {
                let threshold = store
                    .snapshot()
                    .mode_one
                    .item(&name)
                    .map_or(self.state.new_item_threshold, |item| item.threshold);
                self.spawn_job(format!("Capture '{}'", name), move |stop| {
                    capture.capture_watch_item(&name, threshold, &stop).map(|_| ())
                });
                Ok(())
            }
            Action::RemoveItem(name) => store.remove_item(&name).map(|_| ()),
            Action::SetItemActive(name, active) => store.set_item_active(&name, active).map(|_| ()),
            Action::UpdateItem(item) => store.upsert_item(item),
            Action::CaptureAnchor(role) => {
                self.spawn_job(format!("Capture {}", role), move |stop| {
                    capture.capture_anchor(role, &stop).map(|_| ())
                });
                Ok(())
            }
            Action::CaptureMissingAnchors => {
                self.spawn_job("Capture missing anchors", move |stop| {
                    capture.capture_missing_anchors(&stop).map(|_| ())
                });
                Ok(())
            }
            Action::ClearAnchor(role) => store.clear_anchor(role),
            Action::CaptureRegion => {
                self.spawn_job("Capture price region", move |stop| {
                    capture.capture_monitor_region(&stop).map(|_| ())
                });
                Ok(())
            }
            Action::CaptureProbe => {
                self.spawn_job("Capture termination pixel", move |stop| {
                    capture.capture_termination_probe(&stop).map(|_| ())
                });
                Ok(())
            }
            Action::SetProbeColor(color) => {
                store.update_mode_two(|monitor| monitor.termination.color = color)
            }
            Action::UpdateMonitor {
                threshold,
                poll_interval_ms,
            } => store.update_mode_two(|monitor| {
                monitor.threshold = threshold;
                monitor.poll_interval_ms = poll_interval_ms;
            }),
            Action::Record(slot) => {
                self.start_recording(slot);
                Ok(())
            }
            Action::StartModeTwo => {
                // Loads both macro files before the worker starts
                let mode_two = self.ctx.mode_two.clone();
                thread::spawn(move || mode_two.start());
                Ok(())
            }
            Action::StopModeTwo => {
                let mode_two = self.ctx.mode_two.clone();
                thread::spawn(move || mode_two.stop());
                Ok(())
            }
            Action::CancelJob => {
                self.cancel_job();
                Ok(())
            }
        };

        if let Err(e) = result {
            error!("GUI: {:#}", e);
        }
    }

    fn start_recording(&mut self, slot: MacroSlot) {
        let config = self.ctx.store.snapshot();
        let request = RecordingRequest {
            output: config.macros_dir(&self.ctx.base_dir).join(slot.file_name()),
            countdown: Duration::from_millis(config.engine.record_countdown_ms),
            stop_key: config.engine.record_stop_key.clone(),
        };
        let stored_path = config.engine.macros_dir.join(slot.file_name());

        let hub = self.ctx.hub.clone();
        let reporter = self.ctx.reporter.clone();
        let store = self.ctx.store.clone();
        let mode_two = self.ctx.mode_two.clone();

        self.spawn_job(format!("Record {} macro", slot.label()), move |stop| {
            if record_macro(&hub, &request, &stop, &reporter)?.is_none() {
                return Ok(());
            }
            store.update_mode_two(|monitor| match slot {
                MacroSlot::Above => monitor.above_macro = Some(stored_path),
                MacroSlot::Below => monitor.below_macro = Some(stored_path),
            })?;
            mode_two.reload_scripts()
        });
    }
}

impl eframe::App for GuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_status();
        ctx.request_repaint_after(Duration::from_millis(100));

        let snapshot = self.ctx.store.snapshot();
        let busy = self.state.is_busy();
        let mut actions = Vec::new();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("shopwatch");
            render::render_job(ui, &self.state, &mut actions);

            egui::ScrollArea::vertical().show(ui, |ui| {
                render::render_mode_one(
                    ui,
                    &snapshot.mode_one,
                    self.ctx.mode_one.states(),
                    self.ctx.mode_one.is_running(),
                    &mut self.state,
                    busy,
                    &mut actions,
                );
                render::render_mode_two(
                    ui,
                    &snapshot.mode_two,
                    self.ctx.mode_two.state(),
                    &mut self.state,
                    busy,
                    &mut actions,
                );
                render::render_anchors(ui, &snapshot.anchors, busy, &mut actions);
                render::render_status_log(ui, &self.state);
            });
        });

        for action in actions {
            self.apply(action);
        }
    }
}

/// Run the GUI application.
/// This function blocks until the window is closed.
pub fn run_gui(ctx: AppContext) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(Vec2::new(760.0, 820.0))
            .with_min_inner_size(Vec2::new(520.0, 480.0))
            .with_title("shopwatch"),
        ..Default::default()
    };

    info!("GUI: Starting window");
    eframe::run_native(
        "shopwatch",
        options,
        Box::new(move |_cc| Ok(Box::new(GuiApp::new(ctx)))),
    )
}
