// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Threshold and playback sliders.

use crate::models::params::{
    MASK_THRESHOLD_RANGE, MIN_AREA_RANGE, SPEED_RANGE, SPEED_STEP, VOLUME_RANGE,
};

/// Slider positions, edited in place by [`show`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderValues {
    pub mask_threshold: u8,
    pub min_area: u32,
    pub volume: u8,
    pub speed: f64,
}

/// Which sliders moved this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliderChanges {
    pub mask_threshold: bool,
    pub min_area: bool,
    pub volume: bool,
    pub speed: bool,
}

/// Display the slider row.
pub fn show(ui: &mut egui::Ui, values: &mut SliderValues) -> SliderChanges {
    let mut changes = SliderChanges::default();

    egui::Grid::new("controls")
        .num_columns(4)
        .spacing([16.0, 4.0])
        .show(ui, |ui| {
            ui.label("Mask Thresh");
            ui.label("Area Thresh");
            ui.label("Volume");
            ui.label("Speed");
            ui.end_row();

            changes.mask_threshold = ui
                .add(egui::Slider::new(&mut values.mask_threshold, MASK_THRESHOLD_RANGE))
                .changed();
            changes.min_area = ui
                .add(egui::Slider::new(&mut values.min_area, MIN_AREA_RANGE))
                .changed();
            changes.volume = ui
                .add(egui::Slider::new(&mut values.volume, VOLUME_RANGE))
                .changed();
            changes.speed = ui
                .add(
                    egui::Slider::new(&mut values.speed, SPEED_RANGE)
                        .step_by(SPEED_STEP)
                        .fixed_decimals(2),
                )
                .changed();
            ui.end_row();
        });

    changes
}
