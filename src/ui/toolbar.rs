// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Prompt entry and view controls.
//!
//! This module provides the toolbar where users describe the app to
//! generate, pick a device class and control the canvas zoom.

use crate::io::api::{self, MAX_PROMPT_CHARS, MIN_PROMPT_CHARS};
use crate::models::DeviceClass;

/// Result of toolbar interaction.
pub enum ToolbarAction {
    None,
    Generate,
    Cancel,
    ChangeDevice(DeviceClass),
    NewProject,
    ZoomIn,
    ZoomOut,
    ResetView,
}

/// Display the toolbar.
pub fn show(
    ui: &mut egui::Ui,
    prompt: &mut String,
    device: DeviceClass,
    busy: bool,
    scale: f32,
) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        ui.label("Describe your app:");
        let response = ui.add(
            egui::TextEdit::singleline(prompt)
                .hint_text("A recipe app with a feed, detail page and shopping list")
                .char_limit(MAX_PROMPT_CHARS)
                .desired_width(420.0),
        );

        let valid = api::validate_prompt(prompt).is_ok();
        let count = prompt.trim().chars().count();
        let counter = egui::RichText::new(format!("{}/{}", count, MAX_PROMPT_CHARS)).weak();
        ui.label(if valid || count == 0 { counter } else { counter.color(egui::Color32::LIGHT_RED) })
            .on_hover_text(format!("{} to {} characters", MIN_PROMPT_CHARS, MAX_PROMPT_CHARS));

        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

        let (enabled, hint) = generate_button(prompt, busy);
        let generate = ui.add_enabled(enabled, egui::Button::new("▶ Generate")).on_hover_text(hint);
        if generate.clicked() || (submitted && enabled) {
            action = ToolbarAction::Generate;
        }
        if busy && ui.button("⏹ Cancel").clicked() {
            action = ToolbarAction::Cancel;
        }

        ui.separator();

        ui.add_enabled_ui(!busy, |ui| {
            egui::ComboBox::from_id_source("device_class")
                .selected_text(device.label())
                .show_ui(ui, |ui| {
                    for candidate in DeviceClass::ALL {
                        if ui.selectable_label(device == candidate, candidate.label()).clicked()
                            && device != candidate
                        {
                            action = ToolbarAction::ChangeDevice(candidate);
                        }
                    }
                });
            if ui.button("New").on_hover_text("Clear the canvas").clicked() {
                action = ToolbarAction::NewProject;
            }
        });

        ui.separator();

        if ui.button("−").on_hover_text("Zoom out (Ctrl -)").clicked() {
            action = ToolbarAction::ZoomOut;
        }
        ui.label(format!("{:.0}%", scale * 100.0));
        if ui.button("+").on_hover_text("Zoom in (Ctrl +)").clicked() {
            action = ToolbarAction::ZoomIn;
        }
        if ui.button("Reset view").on_hover_text("Ctrl 0").clicked() {
            action = ToolbarAction::ResetView;
        }
    });

    action
}

/// Whether Generate is enabled, and its hover hint. A valid prompt can be
/// submitted while busy; it supersedes the running generation.
fn generate_button(prompt: &str, busy: bool) -> (bool, &'static str) {
    let valid = api::validate_prompt(prompt).is_ok();
    let hint = if busy {
        "Replace the running generation"
    } else {
        "Generate screens"
    };
    (valid, hint)
}
