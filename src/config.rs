// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Launch-time settings.
//!
//! Every field has a built-in default. A YAML or JSON file named by the
//! `MOTION_TRACKER_CONFIG` environment variable may override any of them;
//! the application never writes settings back.

use std::path::Path;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::io::media::FfmpegTools;
use crate::models::params::{
    DetectionParams, PlaybackParams, DEFAULT_MASK_THRESHOLD, DEFAULT_MIN_AREA, DEFAULT_SPEED,
    DEFAULT_VOLUME,
};
use crate::vision::background::ModelSettings;

/// Environment variable naming an optional settings file.
pub const CONFIG_ENV: &str = "MOTION_TRACKER_CONFIG";

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Frame delay at 1x speed, in milliseconds.
    pub base_delay_ms: u64,
    /// Background model memory, in frames.
    pub history: usize,
    pub detect_shadows: bool,
    pub ffmpeg: String,
    pub ffprobe: String,
    pub mask_threshold: u8,
    pub min_area: u32,
    pub volume: u8,
    pub speed: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_delay_ms: 30,
            history: 500,
            detect_shadows: true,
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            mask_threshold: DEFAULT_MASK_THRESHOLD,
            min_area: DEFAULT_MIN_AREA,
            volume: DEFAULT_VOLUME,
            speed: DEFAULT_SPEED,
        }
    }
}

impl Config {
    /// Load from the file named by [`CONFIG_ENV`], or defaults when unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// Load settings from a YAML or JSON file, chosen by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let extension = path.extension().and_then(|s| s.to_str());
        let config: Config = match extension {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text)?,
            Some("json") => serde_json::from_str(&text)?,
            _ => bail!("Unsupported config extension: {:?}", extension),
        };
        Ok(config.sanitized())
    }

    /// Clamp values into the ranges the controls accept.
    pub fn sanitized(mut self) -> Self {
        let playback = PlaybackParams::new(self.volume, self.speed);
        self.volume = playback.volume();
        self.speed = playback.speed();
        self.min_area = self.min_area.min(5000);
        self.history = self.history.max(1);
        self
    }

    pub fn detection(&self) -> DetectionParams {
        let mut params = DetectionParams {
            mask_threshold: self.mask_threshold,
            ..DetectionParams::default()
        };
        params.set_min_area(self.min_area);
        params
    }

    pub fn playback(&self) -> PlaybackParams {
        PlaybackParams::new(self.volume, self.speed)
    }

    pub fn model(&self) -> ModelSettings {
        ModelSettings {
            history: self.history,
            detect_shadows: self.detect_shadows,
        }
    }

    pub fn tools(&self) -> FfmpegTools {
        FfmpegTools {
            ffmpeg: self.ffmpeg.clone(),
            ffprobe: self.ffprobe.clone(),
        }
    }
}
