// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! OpenCV MOG2 background subtractor.

use image::{GrayImage, RgbImage};
use opencv::core::{Mat, Ptr};
use opencv::prelude::*;
use opencv::{imgproc, video};

use super::background::{BackgroundModel, DetectError, ModelSettings};

/// Gaussian-mixture background model from OpenCV.
pub struct Mog2Background {
    subtractor: Ptr<video::BackgroundSubtractorMOG2>,
}

impl Mog2Background {
    pub fn new(settings: ModelSettings, threshold: u8) -> Result<Self, DetectError> {
        let subtractor = video::create_background_subtractor_mog2(
            settings.history as i32,
            f64::from(threshold),
            settings.detect_shadows,
        )?;
        Ok(Self { subtractor })
    }
}

fn rgb_to_bgr_mat(frame: &RgbImage) -> Result<Mat, DetectError> {
    let flat = Mat::from_slice(frame.as_raw())?;
    let shaped = flat.reshape(3, frame.height() as i32)?;
    let mut bgr = Mat::default();
    imgproc::cvt_color(&shaped, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}

impl BackgroundModel for Mog2Background {
    fn apply(&mut self, frame: &RgbImage, threshold: u8) -> Result<GrayImage, DetectError> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectError::EmptyFrame { width, height });
        }

        self.subtractor.set_var_threshold(f64::from(threshold))?;
        let input = rgb_to_bgr_mat(frame)?;
        let mut mask = Mat::default();
        self.subtractor.apply(&input, &mut mask, -1.0)?;

        let bytes = mask.data_bytes()?.to_vec();
        GrayImage::from_raw(width, height, bytes).ok_or(DetectError::EmptyFrame { width, height })
    }
}
