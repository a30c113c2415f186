// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Transport toolbar.
//!
//! Open, display-mode toggle, pause/play and quit buttons along the top of
//! the window.

/// Button pressed this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    None,
    Open,
    ToggleMode,
    TogglePause,
    Quit,
}

/// Display the toolbar.
pub fn show(
    ui: &mut egui::Ui,
    mode_label: &str,
    pause_label: &str,
    can_pause: bool,
) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        if ui.button("Open Video").clicked() {
            action = ToolbarAction::Open;
        }

        if ui.button(mode_label).clicked() {
            action = ToolbarAction::ToggleMode;
        }

        if ui
            .add_enabled(can_pause, egui::Button::new(pause_label))
            .clicked()
        {
            action = ToolbarAction::TogglePause;
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("Quit").clicked() {
                action = ToolbarAction::Quit;
            }
        });
    });

    action
}
