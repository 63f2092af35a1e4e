// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Screen list and details panel.
//!
//! Lists the project's screens with their status, shows the selected
//! screen's details and offers generate, retry, add and duplicate operations.

use crate::engine::RegistrySnapshot;
use crate::models::{ScreenId, ScreenStatus};

/// Result of properties panel interaction.
pub enum PropertiesAction {
    None,
    Select(ScreenId),
    /// Generate one screen: pending, failed or ready.
    Generate(ScreenId),
    AddBlank,
    Duplicate(ScreenId),
}

/// Display the properties panel.
pub fn show(
    ui: &mut egui::Ui,
    snapshot: &RegistrySnapshot,
    selected: Option<&ScreenId>,
    busy: bool,
) -> PropertiesAction {
    let mut action = PropertiesAction::None;

    ui.heading("Project");
    match &snapshot.project {
        Some(project) => {
            egui::Grid::new("project_grid").num_columns(2).show(ui, |ui| {
                ui.label("Name:");
                ui.label(&project.name);
                ui.end_row();
                ui.label("Theme:");
                ui.label(project.theme.as_str());
                ui.end_row();
                ui.label("Device:");
                ui.label(project.device_class.label());
                ui.end_row();
            });
        }
        None => {
            ui.label(egui::RichText::new("No project").italics().weak());
            return action;
        }
    }

    ui.separator();
    ui.horizontal(|ui| {
        ui.heading("Screens");
        ui.label(
            egui::RichText::new(format!(
                "{}/{} ready",
                snapshot.count(ScreenStatus::Ready),
                snapshot.screens.len()
            ))
            .weak(),
        );
    });

    egui::ScrollArea::vertical()
        .id_source("screen_list")
        .max_height(300.0)
        .show(ui, |ui| {
            for screen in &snapshot.screens {
                ui.horizontal(|ui| {
                    let is_selected = selected == Some(&screen.id);
                    if ui.selectable_label(is_selected, &screen.name).clicked() {
                        action = PropertiesAction::Select(screen.id.clone());
                    }
                    ui.label(egui::RichText::new(screen.status.label()).small().color(status_color(screen.status)));
                    let quick = match screen.status {
                        ScreenStatus::Failed => Some(("↻", "Retry")),
                        ScreenStatus::Pending => Some(("▶", "Generate")),
                        _ => None,
                    };
                    if let Some((icon, hint)) = quick {
                        if ui.add_enabled(!busy, egui::Button::new(icon).small()).on_hover_text(hint).clicked() {
                            action = PropertiesAction::Generate(screen.id.clone());
                        }
                    }
                });
            }
        });

    ui.horizontal(|ui| {
        if ui.add_enabled(!busy, egui::Button::new("Add screen")).clicked() {
            action = PropertiesAction::AddBlank;
        }
        let can_duplicate = !busy && selected.is_some();
        if ui.add_enabled(can_duplicate, egui::Button::new("Duplicate")).clicked() {
            if let Some(id) = selected {
                action = PropertiesAction::Duplicate(id.clone());
            }
        }
    });

    let Some(screen) = selected.and_then(|id| snapshot.screens.iter().find(|s| &s.id == id)) else {
        return action;
    };

    ui.separator();
    ui.heading(&screen.name);
    egui::Grid::new("screen_grid").num_columns(2).show(ui, |ui| {
        ui.label("Id:");
        ui.label(screen.id.as_str());
        ui.end_row();
        ui.label("Status:");
        ui.label(screen.status.label());
        ui.end_row();
        ui.label("Position:");
        ui.label(format!("{}, {}", screen.geometry.x, screen.geometry.y));
        ui.end_row();
        ui.label("Size:");
        ui.label(format!("{} × {}", screen.geometry.w, screen.geometry.h));
        ui.end_row();
    });
    if !screen.purpose.is_empty() {
        ui.label(egui::RichText::new(&screen.purpose).strong());
    }
    if !screen.description.is_empty() {
        ui.label(&screen.description);
    }
    let label = match screen.status {
        ScreenStatus::Pending => Some("Generate"),
        ScreenStatus::Ready | ScreenStatus::Failed => Some("Regenerate"),
        ScreenStatus::Generating => None,
    };
    if let Some(label) = label {
        if ui.add_enabled(!busy, egui::Button::new(label)).clicked() {
            action = PropertiesAction::Generate(screen.id.clone());
        }
    }

    action
}

fn status_color(status: ScreenStatus) -> egui::Color32 {
    match status {
        ScreenStatus::Pending => egui::Color32::GRAY,
        ScreenStatus::Generating => egui::Color32::LIGHT_BLUE,
        ScreenStatus::Ready => egui::Color32::LIGHT_GREEN,
        ScreenStatus::Failed => egui::Color32::LIGHT_RED,
    }
}
