//! GUI rendering functions.
//!
//! Each section reads a session snapshot and pushes the operator's requests
//! as `Action`s; the app applies them after rendering.

use eframe::egui::{self, Color32, RichText};

use super::state::{GuiState, MacroSlot, StatusKind};
use crate::automation::{ItemState, MonitorState};
use crate::automation::mode_one::ItemStates;
use crate::session::{
    AnchorRole, AnchorSet, Color, ModeOneConfig, MonitorConfig, WatchItem, MIN_POLL_INTERVAL_MS,
};

/// An operator request collected during rendering.
#[derive(Clone, Debug)]
pub enum Action {
    StartModeOne,
    StopModeOne,
    AddItem,
    RecaptureItem(String),
    RemoveItem(String),
    SetItemActive(String, bool),
    UpdateItem(WatchItem),
    CaptureAnchor(AnchorRole),
    CaptureMissingAnchors,
    ClearAnchor(AnchorRole),
    CaptureRegion,
    CaptureProbe,
    SetProbeColor(Color),
    UpdateMonitor { threshold: f64, poll_interval_ms: u64 },
    Record(MacroSlot),
    StartModeTwo,
    StopModeTwo,
    CancelJob,
}

fn section(ui: &mut egui::Ui, title: &str) {
    ui.add_space(8.0);
    ui.separator();
    ui.heading(title);
    ui.add_space(4.0);
}

fn coordinate_text(value: Option<crate::session::Coordinate>) -> RichText {
    match value {
        Some(at) => RichText::new(at.to_string()),
        None => RichText::new("not set").color(Color32::from_rgb(200, 120, 0)),
    }
}

/// Render the anchor table.
pub fn render_anchors(ui: &mut egui::Ui, anchors: &AnchorSet, busy: bool, actions: &mut Vec<Action>) {
    section(ui, "Anchors");

    egui::Grid::new("anchors").striped(true).show(ui, |ui| {
        for role in AnchorRole::ALL {
            ui.label(role.label());
            ui.label(coordinate_text(anchors.get(role)));
            if ui.add_enabled(!busy, egui::Button::new("Capture")).clicked() {
                actions.push(Action::CaptureAnchor(role));
            }
            if ui
                .add_enabled(anchors.get(role).is_some(), egui::Button::new("Clear"))
                .clicked()
            {
                actions.push(Action::ClearAnchor(role));
            }
            ui.end_row();
        }
    });

    let missing = anchors.missing().len();
    ui.add_enabled_ui(!busy && missing > 0, |ui| {
        if ui
            .button(format!("Capture {} missing anchors", missing))
            .clicked()
        {
            actions.push(Action::CaptureMissingAnchors);
        }
    });
}

fn item_state_text(state: ItemState) -> RichText {
    match state {
        ItemState::Idle => RichText::new("idle").color(Color32::GRAY),
        ItemState::Polling => RichText::new("polling").color(Color32::from_rgb(0, 120, 200)),
        ItemState::ConfirmPending => {
            RichText::new("confirming").color(Color32::from_rgb(200, 150, 0))
        }
        ItemState::Acted => RichText::new("bought").color(Color32::from_rgb(0, 150, 0)),
    }
}

/// Render the Mode One item list and controls.
pub fn render_mode_one(
    ui: &mut egui::Ui,
    config: &ModeOneConfig,
    states: &ItemStates,
    running: bool,
    state: &mut GuiState,
    busy: bool,
    actions: &mut Vec<Action>,
) {
    section(ui, "Mode One: watch items");

    egui::Grid::new("watch_items").striped(true).show(ui, |ui| {
        ui.label(RichText::new("Name").strong());
        ui.label(RichText::new("Location").strong());
        ui.label(RichText::new("Threshold").strong());
        ui.label(RichText::new("Poll (ms)").strong());
        ui.label(RichText::new("Active").strong());
        ui.label(RichText::new("State").strong());
        ui.end_row();

        for item in &config.items {
            let mut edited = item.clone();
            ui.label(&item.name);
            ui.label(item.coordinate.to_string());
            let threshold_changed = ui
                .add(egui::DragValue::new(&mut edited.threshold).range(0.0..=f64::MAX).speed(1.0))
                .changed();
            let poll_changed = ui
                .add(egui::DragValue::new(&mut edited.poll_interval_ms).range(MIN_POLL_INTERVAL_MS..=60_000).speed(10.0))
                .changed();
            if threshold_changed || poll_changed {
                actions.push(Action::UpdateItem(edited.clone()));
            }
            let mut active = item.active;
            if ui.checkbox(&mut active, "").changed() {
                actions.push(Action::SetItemActive(item.name.clone(), active));
            }
            ui.label(item_state_text(states.get(&item.name)));
            if ui.add_enabled(!busy, egui::Button::new("Recapture")).clicked() {
                actions.push(Action::RecaptureItem(item.name.clone()));
            }
            if ui.button("Remove").clicked() {
                actions.push(Action::RemoveItem(item.name.clone()));
            }
            ui.end_row();
        }
    });

    ui.add_space(4.0);
    ui.horizontal(|ui| {
        ui.label("Name:");
        ui.text_edit_singleline(&mut state.new_item_name);
        ui.label("Threshold:");
        ui.add(egui::DragValue::new(&mut state.new_item_threshold).range(0.0..=f64::MAX).speed(1.0));
        let can_add = !busy && !state.new_item_name.trim().is_empty();
        if ui.add_enabled(can_add, egui::Button::new("Add (capture location)")).clicked() {
            actions.push(Action::AddItem);
        }
    });

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        ui.add_enabled_ui(!running, |ui| {
            if ui.button(RichText::new("▶ Start Mode One").size(16.0)).clicked() {
                actions.push(Action::StartModeOne);
            }
        });
        ui.add_space(20.0);
        ui.add_enabled_ui(running, |ui| {
            if ui.button(RichText::new("◼ Stop").size(16.0)).clicked() {
                actions.push(Action::StopModeOne);
            }
        });
    });
}

fn monitor_state_text(state: MonitorState) -> RichText {
    match state {
        MonitorState::Idle => RichText::new("idle").color(Color32::GRAY),
        MonitorState::Running => RichText::new("running").color(Color32::from_rgb(0, 120, 200)),
        MonitorState::Terminating => {
            RichText::new("terminating").color(Color32::from_rgb(200, 150, 0))
        }
        MonitorState::Stopped => {
            RichText::new("stopped (probe matched)").color(Color32::from_rgb(0, 150, 0))
        }
    }
}

/// Render the Mode Two monitor settings and controls.
pub fn render_mode_two(
    ui: &mut egui::Ui,
    config: &MonitorConfig,
    monitor_state: MonitorState,
    state: &mut GuiState,
    busy: bool,
    actions: &mut Vec<Action>,
) {
    section(ui, "Mode Two: threshold macros");

    let mut threshold = config.threshold;
    let mut poll_interval_ms = config.poll_interval_ms;

    egui::Grid::new("monitor").striped(true).show(ui, |ui| {
        ui.label("Price region");
        ui.label(match config.price_region {
            Some(region) => RichText::new(region.to_string()),
            None => RichText::new("not set").color(Color32::from_rgb(200, 120, 0)),
        });
        if ui.add_enabled(!busy, egui::Button::new("Capture")).clicked() {
            actions.push(Action::CaptureRegion);
        }
        ui.end_row();

        ui.label("Threshold");
        let threshold_changed = ui
            .add(egui::DragValue::new(&mut threshold).range(0.0..=f64::MAX).speed(1.0))
            .changed();
        ui.end_row();

        ui.label("Poll (ms)");
        let poll_changed = ui
            .add(egui::DragValue::new(&mut poll_interval_ms).range(MIN_POLL_INTERVAL_MS..=60_000).speed(10.0))
            .changed();
        ui.end_row();

        if threshold_changed || poll_changed {
            actions.push(Action::UpdateMonitor {
                threshold,
                poll_interval_ms,
            });
        }

        for (slot, path) in [
            (MacroSlot::Above, &config.above_macro),
            (MacroSlot::Below, &config.below_macro),
        ] {
            ui.label(format!("{} macro", slot.label()));
            ui.label(match path {
                Some(path) => RichText::new(path.display().to_string()),
                None => RichText::new("not recorded").color(Color32::from_rgb(200, 120, 0)),
            });
            if ui.add_enabled(!busy, egui::Button::new("Record")).clicked() {
                actions.push(Action::Record(slot));
            }
            ui.end_row();
        }

        ui.label("Termination pixel");
        ui.label(coordinate_text(config.termination.coordinate));
        if ui.add_enabled(!busy, egui::Button::new("Capture")).clicked() {
            actions.push(Action::CaptureProbe);
        }
        ui.end_row();

        ui.label("Expected color (r,g,b)");
        if state.probe_color_text.is_empty() {
            state.probe_color_text = config.termination.color.to_string();
        }
        let response = ui.text_edit_singleline(&mut state.probe_color_text);
        if response.lost_focus() {
            match Color::parse(&state.probe_color_text) {
                Some(color) if color != config.termination.color => {
                    actions.push(Action::SetProbeColor(color))
                }
                Some(_) => {}
                None => state.probe_color_text = config.termination.color.to_string(),
            }
        }
        ui.end_row();
    });

    ui.add_space(8.0);
    let running = matches!(
        monitor_state,
        MonitorState::Running | MonitorState::Terminating
    );
    ui.horizontal(|ui| {
        ui.label("State:");
        ui.label(monitor_state_text(monitor_state));
        ui.add_space(20.0);
        ui.add_enabled_ui(!running, |ui| {
            if ui.button(RichText::new("▶ Start Mode Two").size(16.0)).clicked() {
                actions.push(Action::StartModeTwo);
            }
        });
        ui.add_enabled_ui(running, |ui| {
            if ui.button(RichText::new("◼ Stop").size(16.0)).clicked() {
                actions.push(Action::StopModeTwo);
            }
        });
    });
}

/// Render the running background job, if any.
pub fn render_job(ui: &mut egui::Ui, state: &GuiState, actions: &mut Vec<Action>) {
    let Some(job) = state.job.as_ref().filter(|job| !job.is_done()) else {
        return;
    };
    ui.horizontal(|ui| {
        ui.spinner();
        ui.label(&job.label);
        if ui.button("Stop").clicked() {
            actions.push(Action::CancelJob);
        }
    });
}

/// Render the scrolling status log.
pub fn render_status_log(ui: &mut egui::Ui, state: &GuiState) {
    section(ui, "Status");

    egui::ScrollArea::vertical()
        .id_salt("status_log")
        .max_height(220.0)
        .stick_to_bottom(true)
        .show(ui, |ui| {
            for line in &state.status_log {
                let color = match line.kind {
                    StatusKind::Info => ui.visuals().text_color(),
                    StatusKind::Success => Color32::from_rgb(0, 150, 0),
                    StatusKind::Warning => Color32::from_rgb(200, 150, 0),
                    StatusKind::Error => Color32::from_rgb(200, 0, 0),
                };
                ui.label(RichText::new(format!("[{}] {}", line.time, line.text)).color(color));
            }
        });
}
