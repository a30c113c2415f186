// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Motion detection: background modelling and mask post-processing.

pub mod background;
#[cfg(feature = "video-opencv")]
pub mod cv_overlay;
#[cfg(feature = "video-opencv")]
pub mod mog2;
pub mod postprocess;

use image::{GrayImage, RgbImage};

use crate::models::params::{DetectionParams, DisplayMode};

/// Display frame for one tick.
///
/// With `video-opencv` the mask is cleaned and boxed by OpenCV, falling back
/// to the built-in path if that fails.
pub fn render(
    frame: &RgbImage,
    foreground: &GrayImage,
    params: &DetectionParams,
    mode: DisplayMode,
) -> RgbImage {
    #[cfg(feature = "video-opencv")]
    match cv_overlay::process(frame, foreground, params, mode) {
        Ok(display) => return display,
        Err(e) => log::warn!("OpenCV post-processing failed: {}", e),
    }

    postprocess::process(frame, foreground, params, mode)
}

#[cfg(test)]
mod tests {
    use super::background::{BackgroundModel, GaussianBackground, ModelSettings};
    use super::postprocess::{clean_mask, surviving_boxes};
    use crate::util::geometry::BoundingBox;
    use image::{Rgb, RgbImage};

    /// Static textured background with a bright square on the given frames.
    fn synthetic_clip(square_frames: std::ops::RangeInclusive<usize>) -> Vec<RgbImage> {
        (0..10)
            .map(|i| {
                RgbImage::from_fn(200, 160, |x, y| {
                    let inside = (40..140).contains(&x) && (30..130).contains(&y);
                    if square_frames.contains(&i) && inside {
                        Rgb([235, 235, 235])
                    } else {
                        let v = 40 + ((x / 8 + y / 8) % 2) as u8 * 20;
                        Rgb([v, v, v])
                    }
                })
            })
            .collect()
    }

    #[test]
    fn test_moving_square_yields_single_box() {
        let mut model = GaussianBackground::new(ModelSettings::default());
        let expected = BoundingBox { x: 40, y: 30, width: 100, height: 100 };

        for (i, frame) in synthetic_clip(3..=5).iter().enumerate() {
            let foreground = model.apply(frame, 16).unwrap();
            let boxes = surviving_boxes(&clean_mask(&foreground, 16), 500);

            if (3..=5).contains(&i) {
                assert_eq!(boxes, vec![expected], "frame {}", i);
            } else {
                assert!(boxes.is_empty(), "frame {} has {:?}", i, boxes);
            }
        }
    }

    #[test]
    fn test_area_threshold_filters_square() {
        let mut model = GaussianBackground::new(ModelSettings::default());
        let clip = synthetic_clip(3..=5);
        for frame in &clip[..3] {
            model.apply(frame, 16).unwrap();
        }

        let mask = clean_mask(&model.apply(&clip[3], 16).unwrap(), 16);
        assert_eq!(surviving_boxes(&mask, 0).len(), 1);
        assert_eq!(surviving_boxes(&mask, 5000).len(), 1);
        assert!(surviving_boxes(&mask, 10_000).is_empty());
    }
}
