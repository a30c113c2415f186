// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! OpenCV `VideoCapture` frame source.

use std::path::Path;

use image::RgbImage;
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::{imgproc, videoio};

use super::media::{FrameSource, MediaError};

/// Frames read through OpenCV's capture API.
pub struct CaptureSource {
    capture: videoio::VideoCapture,
    width: u32,
    height: u32,
    released: bool,
}

impl CaptureSource {
    pub fn open(path: &Path) -> Result<Self, MediaError> {
        if !path.is_file() {
            return Err(MediaError::NotFound(path.to_path_buf()));
        }

        let capture = videoio::VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(MediaError::Metadata(format!("cannot open {}", path.display())));
        }

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        log::info!("Opened video: {} ({}x{})", path.display(), width, height);

        Ok(Self {
            capture,
            width,
            height,
            released: false,
        })
    }
}

/// Convert a BGR `Mat` into an RGB image buffer.
pub fn mat_to_rgb(bgr: &Mat) -> Result<RgbImage, MediaError> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

    let width = rgb.cols() as u32;
    let height = rgb.rows() as u32;
    let bytes = rgb.data_bytes()?.to_vec();
    RgbImage::from_raw(width, height, bytes)
        .ok_or(MediaError::InvalidDimensions { width, height })
}

impl FrameSource for CaptureSource {
    fn read(&mut self) -> Result<Option<RgbImage>, MediaError> {
        if self.released {
            return Ok(None);
        }

        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }
        mat_to_rgb(&frame).map(Some)
    }

    fn rewind(&mut self) -> Result<(), MediaError> {
        self.capture.set(videoio::CAP_PROP_POS_FRAMES, 0.0)?;
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.capture.release() {
            log::debug!("VideoCapture release failed: {}", e);
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        self.release();
    }
}
