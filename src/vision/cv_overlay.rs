// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Mask cleanup and box overlay through `opencv::imgproc`.

use image::{GrayImage, RgbImage};
use opencv::core::{Mat, Point, Scalar, Size, Vector, BORDER_CONSTANT};
use opencv::imgproc::{
    self, CHAIN_APPROX_SIMPLE, LINE_8, MORPH_ELLIPSE, MORPH_OPEN, RETR_EXTERNAL, THRESH_BINARY,
};
use opencv::prelude::*;

use super::background::DetectError;
use super::postprocess::{mask_to_rgb, BOX_THICKNESS, OPEN_ITERATIONS};
use crate::models::params::{DetectionParams, DisplayMode};

fn image_to_mat(raw: &[u8], channels: i32, height: u32) -> Result<Mat, DetectError> {
    let flat = Mat::from_slice(raw)?;
    Ok(flat.reshape(channels, height as i32)?.try_clone()?)
}

/// Binarize and open `foreground` with a 3x3 elliptical kernel.
fn clean_mask(foreground: &GrayImage, threshold: u8) -> Result<Mat, DetectError> {
    let map = image_to_mat(foreground.as_raw(), 1, foreground.height())?;

    // THRESH_BINARY keeps values strictly above the cutoff
    let mut binary = Mat::default();
    imgproc::threshold(
        &map,
        &mut binary,
        f64::from(threshold) - 1.0,
        255.0,
        THRESH_BINARY,
    )?;

    let kernel =
        imgproc::get_structuring_element(MORPH_ELLIPSE, Size::new(3, 3), Point::new(-1, -1))?;
    let mut opened = Mat::default();
    imgproc::morphology_ex(
        &binary,
        &mut opened,
        MORPH_OPEN,
        &kernel,
        Point::new(-1, -1),
        i32::from(OPEN_ITERATIONS),
        BORDER_CONSTANT,
        imgproc::morphology_default_border_value()?,
    )?;
    Ok(opened)
}

/// Produce the display frame for one tick.
pub fn process(
    frame: &RgbImage,
    foreground: &GrayImage,
    params: &DetectionParams,
    mode: DisplayMode,
) -> Result<RgbImage, DetectError> {
    let (width, height) = foreground.dimensions();
    if width == 0 || height == 0 {
        return Err(DetectError::EmptyFrame { width, height });
    }

    let mask = clean_mask(foreground, params.mask_threshold)?;

    if mode == DisplayMode::Mask {
        let bytes = mask.data_bytes()?.to_vec();
        let gray = GrayImage::from_raw(width, height, bytes)
            .ok_or(DetectError::EmptyFrame { width, height })?;
        return Ok(mask_to_rgb(&gray));
    }

    let mut contours: Vector<Vector<Point>> = Vector::new();
    imgproc::find_contours(
        &mask,
        &mut contours,
        RETR_EXTERNAL,
        CHAIN_APPROX_SIMPLE,
        Point::new(0, 0),
    )?;

    // RGB order throughout; green is the same in either channel order
    let mut canvas = image_to_mat(frame.as_raw(), 3, frame.height())?;
    for contour in contours.iter() {
        let area = imgproc::contour_area(&contour, false)?;
        if area < f64::from(params.min_area) {
            continue;
        }
        let rect = imgproc::bounding_rect(&contour)?;
        imgproc::rectangle_points(
            &mut canvas,
            Point::new(rect.x, rect.y),
            Point::new(rect.x + rect.width, rect.y + rect.height),
            Scalar::new(0.0, 255.0, 0.0, 0.0),
            BOX_THICKNESS as i32,
            LINE_8,
            0,
        )?;
    }

    let (frame_width, frame_height) = frame.dimensions();
    let bytes = canvas.data_bytes()?.to_vec();
    RgbImage::from_raw(frame_width, frame_height, bytes).ok_or(DetectError::EmptyFrame {
        width: frame_width,
        height: frame_height,
    })
}
