// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Status bar with generation progress and error banner.

use crate::engine::{RegistrySnapshot, RunPhase};
use crate::models::ScreenStatus;

/// Result of status bar interaction.
pub enum ProgressAction {
    None,
    DismissBanner,
}

/// Progress line for a phase, e.g. "Generating screen 2 of 5".
pub fn phase_text(phase: RunPhase) -> Option<String> {
    match phase {
        RunPhase::Idle => None,
        RunPhase::ConfigFetching => Some("Planning screens...".to_string()),
        RunPhase::ConfigFetchFailed => Some("Planning failed".to_string()),
        RunPhase::ConfigReady => Some("Screens planned".to_string()),
        RunPhase::ScreenLoop { index, total } => {
            Some(format!("Generating screen {} of {}", index + 1, total))
        }
    }
}

/// Display the status bar.
pub fn show(
    ui: &mut egui::Ui,
    phase: RunPhase,
    snapshot: &RegistrySnapshot,
    message: Option<&str>,
    banner: Option<&str>,
) -> ProgressAction {
    let mut action = ProgressAction::None;

    if let Some(banner) = banner {
        egui::Frame::none()
            .fill(egui::Color32::from_rgb(90, 30, 30))
            .inner_margin(egui::Margin::symmetric(8.0, 4.0))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(banner).color(egui::Color32::WHITE));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("✕").clicked() {
                            action = ProgressAction::DismissBanner;
                        }
                    });
                });
            });
    }

    ui.horizontal(|ui| {
        match phase_text(phase) {
            Some(text) => {
                ui.spinner();
                ui.label(text);
            }
            None => {
                ui.label(message.unwrap_or("Ready"));
            }
        }

        if !snapshot.screens.is_empty() {
            ui.separator();
            ui.label(format!(
                "{} ready · {} failed · {} pending",
                snapshot.count(ScreenStatus::Ready),
                snapshot.count(ScreenStatus::Failed),
                snapshot.count(ScreenStatus::Pending) + snapshot.count(ScreenStatus::Generating),
            ));
        }
    });

    action
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_text_is_one_based() {
        assert_eq!(
            phase_text(RunPhase::ScreenLoop { index: 0, total: 3 }).as_deref(),
            Some("Generating screen 1 of 3")
        );
        assert_eq!(phase_text(RunPhase::Idle), None);
    }
}
