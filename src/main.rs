//! shopwatch
//!
//! Watches marketplace prices on screen and acts on them: Mode One buys
//! individual items after a confirming second read, Mode Two replays
//! recorded macros depending on the price and stops when a known pixel
//! color appears.

// Hide console window on Windows for GUI mode
#![cfg_attr(windows, windows_subsystem = "windows")]

mod automation;
mod calibration;
mod capture;
#[cfg(windows)]
mod gui;
mod input;
mod logging;
mod macros;
mod ocr;
mod paths;
mod services;
mod session;
#[cfg(test)]
mod testing;

use anyhow::Result;
use tracing::{error, info};

use services::Services;

fn main() -> Result<()> {
    // Set up panic hook to log panics
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let msg = automation::panic_message(panic_info.payload());
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        error!("[PANIC]{} {}", location, msg);
        default_hook(panic_info);
    }));

    // Ensure output directories exist
    paths::ensure_directories()?;
    if let Err(e) = logging::init(&paths::get_log_path()) {
        eprintln!("Warning: {:#}", e);
    }
    info!("shopwatch {} starting", env!("CARGO_PKG_VERSION"));

    // Screen, OCR and input backends are required before any controller exists
    let services = Services::platform().inspect_err(|e| error!("Startup failed: {:#}", e))?;

    run(services)
}

#[cfg(windows)]
fn run(services: Services) -> Result<()> {
    use anyhow::anyhow;
    use std::sync::Arc;

    use automation::{ModeOneController, ModeTwoController, StatusReporter};
    use calibration::{CoordinateCaptureService, ScreenOverlay};
    use input::InputHub;
    use session::SessionStore;

    let store = SessionStore::open(paths::get_config_path());
    let hub = InputHub::new();
    input::hook::start_global_hook(hub.clone())?;

    let (reporter, status_rx) = StatusReporter::channel();
    let base_dir = paths::get_exe_dir().clone();

    let mode_one = Arc::new(ModeOneController::new(
        store.clone(),
        services.clone(),
        reporter.clone(),
    ));
    let mode_two = Arc::new(ModeTwoController::new(
        store.clone(),
        services,
        reporter.clone(),
        base_dir.clone(),
    ));
    let capture = Arc::new(CoordinateCaptureService::new(
        hub.clone(),
        Arc::new(ScreenOverlay::new()),
        store.clone(),
        reporter.clone(),
    ));

    let result = gui::run_gui(gui::AppContext {
        store,
        hub,
        reporter,
        status_rx,
        mode_one,
        mode_two,
        capture,
        base_dir,
    });

    match result {
        Ok(()) => {
            info!("GUI application exited normally");
            Ok(())
        }
        Err(e) => {
            error!("GUI error: {}", e);
            Err(anyhow!("GUI error: {}", e))
        }
    }
}

#[cfg(not(windows))]
fn run(_services: Services) -> Result<()> {
    anyhow::bail!("shopwatch only runs on Windows")
}
