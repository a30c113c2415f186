// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Live user-adjustable parameters.
//!
//! Detection parameters are read fresh on every tick; playback parameters
//! are pushed to the audio channel and the scheduler as soon as they change.

use std::ops::RangeInclusive;

pub const MASK_THRESHOLD_RANGE: RangeInclusive<u8> = 0..=255;
pub const MIN_AREA_RANGE: RangeInclusive<u32> = 0..=5000;
pub const VOLUME_RANGE: RangeInclusive<u8> = 0..=100;
pub const SPEED_RANGE: RangeInclusive<f64> = 0.25..=2.0;
pub const SPEED_STEP: f64 = 0.05;

pub const DEFAULT_MASK_THRESHOLD: u8 = 16;
pub const DEFAULT_MIN_AREA: u32 = 500;
pub const DEFAULT_VOLUME: u8 = 100;
pub const DEFAULT_SPEED: f64 = 1.0;

/// Thresholds used by the detector and post-processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionParams {
    pub mask_threshold: u8,
    pub min_area: u32,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            mask_threshold: DEFAULT_MASK_THRESHOLD,
            min_area: DEFAULT_MIN_AREA,
        }
    }
}

impl DetectionParams {
    pub fn set_min_area(&mut self, min_area: u32) {
        self.min_area = min_area.min(*MIN_AREA_RANGE.end());
    }
}

/// Audio volume and playback speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackParams {
    volume: u8,
    speed: f64,
}

impl Default for PlaybackParams {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            speed: DEFAULT_SPEED,
        }
    }
}

impl PlaybackParams {
    pub fn new(volume: u8, speed: f64) -> Self {
        let mut params = Self::default();
        params.set_volume(volume);
        params.set_speed(speed);
        params
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(*VOLUME_RANGE.end());
    }

    /// Clamp to the speed range; non-finite input leaves the speed unchanged.
    pub fn set_speed(&mut self, speed: f64) {
        if speed.is_finite() {
            self.speed = speed.clamp(*SPEED_RANGE.start(), *SPEED_RANGE.end());
        }
    }
}

/// What the display shows each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Original frame with boxes around moving regions.
    #[default]
    Boxes,
    /// Cleaned binary motion mask.
    Mask,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Boxes => DisplayMode::Mask,
            DisplayMode::Mask => DisplayMode::Boxes,
        }
    }

    /// Label for the button that switches away from this mode.
    pub fn toggle_label(self) -> &'static str {
        match self {
            DisplayMode::Boxes => "Show Mask",
            DisplayMode::Mask => "Show Boxes",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let detection = DetectionParams::default();
        assert_eq!(detection.mask_threshold, 16);
        assert_eq!(detection.min_area, 500);

        let playback = PlaybackParams::default();
        assert_eq!(playback.volume(), 100);
        assert_eq!(playback.speed(), 1.0);
    }

    #[test]
    fn test_setters_clamp() {
        let mut playback = PlaybackParams::default();
        playback.set_volume(250);
        assert_eq!(playback.volume(), 100);
        playback.set_speed(9.0);
        assert_eq!(playback.speed(), 2.0);
        playback.set_speed(0.0);
        assert_eq!(playback.speed(), 0.25);
        playback.set_speed(f64::NAN);
        assert_eq!(playback.speed(), 0.25);

        let mut detection = DetectionParams::default();
        detection.set_min_area(70_000);
        assert_eq!(detection.min_area, 5000);
    }

    #[test]
    fn test_mode_toggle_twice_restores() {
        let mode = DisplayMode::default();
        assert_eq!(mode.toggle_label(), "Show Mask");
        assert_eq!(mode.toggled().toggle_label(), "Show Boxes");
        assert_eq!(mode.toggled().toggled(), mode);
    }
}
