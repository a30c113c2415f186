// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Adaptive background model.
//!
//! Each pixel keeps a running RGB mean and a shared variance. A pixel whose
//! squared distance from the mean exceeds `threshold * variance` is reported
//! as foreground (255), or as shadow (127) when it looks like a darker copy of
//! the background. The model survives threshold changes between frames; only
//! the decision boundary moves.

use image::{GrayImage, Luma, RgbImage};
use thiserror::Error;

/// Value written for foreground pixels.
pub const FOREGROUND: u8 = 255;
/// Value written for pixels classified as cast shadow.
pub const SHADOW: u8 = 127;
/// Value written for background pixels.
pub const BACKGROUND: u8 = 0;

const VARIANCE_INIT: f32 = 15.0;
const VARIANCE_MIN: f32 = 4.0;
const VARIANCE_MAX: f32 = 75.0;
/// Darkest brightness ratio still accepted as a shadow.
const SHADOW_TAU: f32 = 0.5;

/// Errors raised by a background model.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("frame is empty ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
    #[cfg(feature = "video-opencv")]
    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),
}

/// A stateful foreground detector fed one frame per tick.
pub trait BackgroundModel {
    /// Classify `frame` against the model and update it.
    ///
    /// Returns a single-channel map the same size as the frame.
    fn apply(&mut self, frame: &RgbImage, threshold: u8) -> Result<GrayImage, DetectError>;
}

/// Settings shared by background model implementations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSettings {
    /// Number of frames the model effectively remembers.
    pub history: usize,
    pub detect_shadows: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            history: 500,
            detect_shadows: true,
        }
    }
}

/// Per-pixel running Gaussian background model.
pub struct GaussianBackground {
    settings: ModelSettings,
    frames_seen: usize,
    width: u32,
    height: u32,
    mean: Vec<[f32; 3]>,
    variance: Vec<f32>,
}

impl GaussianBackground {
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            settings: ModelSettings {
                history: settings.history.max(1),
                ..settings
            },
            frames_seen: 0,
            width: 0,
            height: 0,
            mean: Vec::new(),
            variance: Vec::new(),
        }
    }

    /// Number of frames folded into the current model.
    #[cfg(test)]
    pub fn frames_seen(&self) -> usize {
        self.frames_seen
    }

    fn seed(&mut self, frame: &RgbImage) {
        self.width = frame.width();
        self.height = frame.height();
        self.mean = frame.pixels().map(|p| to_f32(p.0)).collect();
        self.variance = vec![VARIANCE_INIT; self.mean.len()];
        self.frames_seen = 1;
    }

    fn is_shadow(&self, x: [f32; 3], mean: [f32; 3], variance: f32, threshold: f32) -> bool {
        let denom: f32 = mean.iter().map(|m| m * m).sum();
        if denom <= f32::EPSILON {
            return false;
        }

        let numer: f32 = x.iter().zip(mean.iter()).map(|(a, b)| a * b).sum();
        let ratio = numer / denom;
        if !(SHADOW_TAU..=1.0).contains(&ratio) {
            return false;
        }

        let distortion: f32 = x
            .iter()
            .zip(mean.iter())
            .map(|(a, m)| {
                let d = a - ratio * m;
                d * d
            })
            .sum();

        distortion < threshold * variance * ratio * ratio
    }
}

impl BackgroundModel for GaussianBackground {
    fn apply(&mut self, frame: &RgbImage, threshold: u8) -> Result<GrayImage, DetectError> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectError::EmptyFrame { width, height });
        }

        // First frame (or a resolution change) becomes the background
        if self.frames_seen == 0 || (width, height) != (self.width, self.height) {
            self.seed(frame);
            return Ok(GrayImage::new(width, height));
        }

        self.frames_seen += 1;
        let alpha = 1.0 / self.frames_seen.min(self.settings.history) as f32;
        let slow = 1.0 / self.settings.history as f32;
        let threshold = f32::from(threshold);

        let mut out = GrayImage::new(width, height);
        for (i, (pixel, out_px)) in frame.pixels().zip(out.pixels_mut()).enumerate() {
            let x = to_f32(pixel.0);
            let mean = self.mean[i];
            let variance = self.variance[i];
            let dist2: f32 = x
                .iter()
                .zip(mean.iter())
                .map(|(a, m)| (a - m) * (a - m))
                .sum();

            if dist2 <= threshold * variance {
                *out_px = Luma([BACKGROUND]);
                blend(&mut self.mean[i], x, alpha);
                self.variance[i] =
                    (variance + alpha * (dist2 - variance)).clamp(VARIANCE_MIN, VARIANCE_MAX);
            } else {
                let value = if self.settings.detect_shadows
                    && self.is_shadow(x, mean, variance, threshold)
                {
                    SHADOW
                } else {
                    FOREGROUND
                };
                *out_px = Luma([value]);
                blend(&mut self.mean[i], x, slow);
            }
        }

        Ok(out)
    }
}

fn to_f32(rgb: [u8; 3]) -> [f32; 3] {
    [f32::from(rgb[0]), f32::from(rgb[1]), f32::from(rgb[2])]
}

fn blend(mean: &mut [f32; 3], x: [f32; 3], rate: f32) {
    for (m, v) in mean.iter_mut().zip(x) {
        *m += rate * (v - *m);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn flat(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
    }

    fn count(map: &GrayImage, value: u8) -> usize {
        map.pixels().filter(|p| p.0[0] == value).count()
    }

    #[test]
    fn test_first_frame_seeds_background() {
        let mut model = GaussianBackground::new(ModelSettings::default());
        let mask = model.apply(&flat(8, 6, 90), 16).unwrap();
        assert_eq!(mask.dimensions(), (8, 6));
        assert_eq!(count(&mask, BACKGROUND), 48);
        assert_eq!(model.frames_seen(), 1);
    }

    #[test]
    fn test_bright_change_is_foreground() {
        let mut model = GaussianBackground::new(ModelSettings::default());
        model.apply(&flat(4, 4, 50), 16).unwrap();
        model.apply(&flat(4, 4, 50), 16).unwrap();

        let mut frame = flat(4, 4, 50);
        frame.put_pixel(1, 1, Rgb([220, 220, 220]));
        let mask = model.apply(&frame, 16).unwrap();

        assert_eq!(mask.get_pixel(1, 1).0[0], FOREGROUND);
        assert_eq!(count(&mask, FOREGROUND), 1);
    }

    #[test]
    fn test_darker_copy_is_shadow() {
        let mut model = GaussianBackground::new(ModelSettings::default());
        model.apply(&flat(2, 2, 200), 16).unwrap();

        let mut frame = flat(2, 2, 200);
        frame.put_pixel(0, 0, Rgb([140, 140, 140]));
        let mask = model.apply(&frame, 16).unwrap();
        assert_eq!(mask.get_pixel(0, 0).0[0], SHADOW);

        let mut no_shadow = GaussianBackground::new(ModelSettings {
            detect_shadows: false,
            ..ModelSettings::default()
        });
        no_shadow.apply(&flat(2, 2, 200), 16).unwrap();
        let mask = no_shadow.apply(&frame, 16).unwrap();
        assert_eq!(mask.get_pixel(0, 0).0[0], FOREGROUND);
    }

    #[test]
    fn test_threshold_change_keeps_model() {
        let mut model = GaussianBackground::new(ModelSettings::default());
        model.apply(&flat(3, 3, 100), 16).unwrap();
        model.apply(&flat(3, 3, 100), 16).unwrap();
        model.apply(&flat(3, 3, 100), 200).unwrap();
        assert_eq!(model.frames_seen(), 3);

        // Small drift: foreground at a strict threshold, background at a loose one
        let drift = flat(3, 3, 110);
        let strict = model.apply(&drift, 1).unwrap();
        assert_eq!(count(&strict, BACKGROUND), 0);
        assert_eq!(model.frames_seen(), 4);
    }

    #[test]
    fn test_resolution_change_reseeds() {
        let mut model = GaussianBackground::new(ModelSettings::default());
        model.apply(&flat(4, 4, 10), 16).unwrap();
        model.apply(&flat(4, 4, 10), 16).unwrap();
        let mask = model.apply(&flat(6, 2, 250), 16).unwrap();
        assert_eq!(mask.dimensions(), (6, 2));
        assert_eq!(count(&mask, BACKGROUND), 12);
        assert_eq!(model.frames_seen(), 1);
    }

    #[test]
    fn test_empty_frame_is_rejected() {
        let mut model = GaussianBackground::new(ModelSettings::default());
        model.apply(&flat(2, 2, 10), 16).unwrap();

        let err = model.apply(&RgbImage::new(0, 3), 16).unwrap_err();
        assert!(matches!(err, DetectError::EmptyFrame { width: 0, height: 3 }));
    }
}
