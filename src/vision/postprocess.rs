// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Foreground map cleanup and overlay rendering.
//!
//! Turns the noisy map produced by a background model into a clean binary
//! mask, extracts the outermost connected regions of that mask, and renders
//! either the mask itself or the original frame with boxes around regions
//! that are large enough.

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::morphology;
use imageproc::rect::Rect;

use crate::models::params::{DetectionParams, DisplayMode};
use crate::util::geometry::{polygon_area, BoundingBox};

/// Box outline color.
pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Box outline width in pixels.
pub const BOX_THICKNESS: u32 = 2;
/// Erode/dilate passes of the 3x3 elliptical kernel used by [`clean_mask`].
pub const OPEN_ITERATIONS: u8 = 2;

/// An outermost connected foreground region.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub bbox: BoundingBox,
    /// Area enclosed by the outer contour through pixel centres.
    pub area: f64,
}

/// Binarize: values at or above `threshold` become 255, all others 0.
pub fn binarize(map: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = map.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] >= threshold { 255 } else { 0 };
    }
    out
}

/// Morphological opening with a 3x3 elliptical kernel, `iterations` times.
///
/// The 3x3 ellipse is a cross, and `k` passes of a cross are one pass of an
/// L1 ball of radius `k`. Pixels outside the image never erode the mask.
pub fn open(mask: &GrayImage, iterations: u8) -> GrayImage {
    morphology::open(mask, Norm::L1, iterations)
}

/// Outer contours of the 8-connected regions of a binary mask.
///
/// Regions sitting inside a hole of another region are not reported.
pub fn find_regions(mask: &GrayImage) -> Vec<Region> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|contour| {
            let xs = contour.points.iter().map(|p| p.x as u32);
            let ys = contour.points.iter().map(|p| p.y as u32);
            let bbox = BoundingBox::from_extent(
                xs.clone().min()?,
                ys.clone().min()?,
                xs.max()?,
                ys.max()?,
            );
            let vertices: Vec<(i64, i64)> = contour
                .points
                .iter()
                .map(|p| (i64::from(p.x), i64::from(p.y)))
                .collect();
            Some(Region {
                bbox,
                area: polygon_area(&vertices),
            })
        })
        .collect()
}

/// Draw a rectangle outline on the edges `x`, `x + width`, `y`, `y + height`.
///
/// The stroke is centred on those edges; whatever falls outside the image is
/// clipped.
pub fn draw_box(image: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>, thickness: u32) {
    let half = (thickness / 2) as i64;
    for t in 0..i64::from(thickness) {
        let inset = t - half;
        let width = i64::from(bbox.width) + 1 - 2 * inset;
        let height = i64::from(bbox.height) + 1 - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at((i64::from(bbox.x) + inset) as i32, (i64::from(bbox.y) + inset) as i32)
            .of_size(width as u32, height as u32);
        draw_hollow_rect_mut(image, rect, color);
    }
}

/// Bounding boxes of regions whose contour area reaches `min_area`.
pub fn surviving_boxes(mask: &GrayImage, min_area: u32) -> Vec<BoundingBox> {
    find_regions(mask)
        .into_iter()
        .filter(|r| r.area >= f64::from(min_area))
        .map(|r| r.bbox)
        .collect()
}

/// Binarize and open a foreground map.
pub fn clean_mask(foreground: &GrayImage, threshold: u8) -> GrayImage {
    open(&binarize(foreground, threshold), OPEN_ITERATIONS)
}

/// Gray to RGB by channel replication.
pub fn mask_to_rgb(mask: &GrayImage) -> RgbImage {
    DynamicImage::ImageLuma8(mask.clone()).into_rgb8()
}

/// Produce the display frame for one tick.
pub fn process(
    frame: &RgbImage,
    foreground: &GrayImage,
    params: &DetectionParams,
    mode: DisplayMode,
) -> RgbImage {
    let mask = clean_mask(foreground, params.mask_threshold);

    match mode {
        DisplayMode::Mask => mask_to_rgb(&mask),
        DisplayMode::Boxes => {
            let mut annotated = frame.clone();
            for bbox in surviving_boxes(&mask, params.min_area) {
                draw_box(&mut annotated, &bbox, BOX_COLOR, BOX_THICKNESS);
            }
            annotated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn mask_with(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        for &(x, y, w, h) in rects {
            for yy in y..y + h {
                for xx in x..x + w {
                    mask.put_pixel(xx, yy, Luma([255]));
                }
            }
        }
        mask
    }

    fn white_count(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p.0[0] == 255).count()
    }

    #[test]
    fn test_binarize_is_inclusive() {
        let map = GrayImage::from_raw(4, 1, vec![0, 15, 16, 200]).unwrap();
        let out = binarize(&map, 16);
        assert_eq!(out.as_raw(), &vec![0, 0, 255, 255]);
    }

    #[test]
    fn test_binarize_monotonic_in_threshold() {
        let map = GrayImage::from_fn(32, 16, |x, y| Luma([((x * 37 + y * 11) % 256) as u8]));
        let mut previous = usize::MAX;
        for threshold in 0..=255u8 {
            let count = white_count(&binarize(&map, threshold));
            assert!(count <= previous, "threshold {} increased count", threshold);
            previous = count;
        }
        assert_eq!(white_count(&binarize(&map, 0)), 32 * 16);
    }

    #[test]
    fn test_open_removes_speckle_keeps_blocks() {
        let mut mask = mask_with(40, 40, &[(10, 10, 12, 12)]);
        mask.put_pixel(2, 30, Luma([255]));
        mask.put_pixel(3, 30, Luma([255]));

        let opened = open(&mask, OPEN_ITERATIONS);
        assert_eq!(opened.get_pixel(2, 30).0[0], 0);
        assert_eq!(opened.get_pixel(16, 16).0[0], 255);
        // Edge midpoints survive, corners are chamfered by the cross kernel
        assert_eq!(opened.get_pixel(10, 16).0[0], 255);
        assert_eq!(opened.get_pixel(10, 10).0[0], 0);
    }

    #[test]
    fn test_open_does_not_erode_image_border() {
        let mask = mask_with(8, 8, &[(0, 0, 8, 8)]);
        let opened = open(&mask, OPEN_ITERATIONS);
        assert_eq!(white_count(&opened), 64);
    }

    #[test]
    fn test_region_box_and_contour_area() {
        let mask = mask_with(200, 160, &[(40, 30, 100, 100)]);
        let regions = find_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].bbox, BoundingBox { x: 40, y: 30, width: 100, height: 100 });
        assert_eq!(regions[0].area, 99.0 * 99.0);
    }

    #[test]
    fn test_diagonal_pixels_are_one_region() {
        let mut mask = GrayImage::new(6, 6);
        for i in 1..5 {
            mask.put_pixel(i, i, Luma([255]));
        }
        let regions = find_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].bbox, BoundingBox { x: 1, y: 1, width: 4, height: 4 });
        assert_eq!(regions[0].area, 0.0);
    }

    #[test]
    fn test_nested_region_is_skipped() {
        // Ring with an island inside its hole
        let mut mask = mask_with(30, 30, &[(5, 5, 20, 20)]);
        for y in 8..22 {
            for x in 8..22 {
                mask.put_pixel(x, y, Luma([0]));
            }
        }
        for y in 13..17 {
            for x in 13..17 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }

        let regions = find_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].bbox, BoundingBox { x: 5, y: 5, width: 20, height: 20 });
        // Contour area covers the hole too
        assert_eq!(regions[0].area, 19.0 * 19.0);
    }

    #[test]
    fn test_region_touching_border_is_external() {
        let mask = mask_with(10, 10, &[(0, 0, 3, 10)]);
        let regions = find_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 2.0 * 9.0);
    }

    #[test]
    fn test_min_area_monotonic() {
        let mask = mask_with(
            120,
            120,
            &[(2, 2, 5, 5), (20, 20, 15, 15), (60, 60, 40, 40), (10, 80, 30, 8)],
        );
        let mut previous = usize::MAX;
        for min_area in (0..=5000).step_by(25) {
            let n = surviving_boxes(&mask, min_area).len();
            assert!(n <= previous, "min_area {} increased box count", min_area);
            previous = n;
        }
        assert_eq!(surviving_boxes(&mask, 0).len(), 4);
        assert_eq!(surviving_boxes(&mask, 500).len(), 1);
    }

    #[test]
    fn test_area_equal_to_minimum_survives() {
        // 21x26 block: contour through pixel centres encloses 20 * 25 = 500
        let mask = mask_with(60, 60, &[(10, 10, 21, 26)]);
        assert_eq!(find_regions(&mask)[0].area, 500.0);
        assert_eq!(surviving_boxes(&mask, 500).len(), 1);
        assert!(surviving_boxes(&mask, 501).is_empty());
    }

    #[test]
    fn test_draw_box_stroke_is_centred_on_edges() {
        let mut image = RgbImage::new(20, 20);
        let bbox = BoundingBox { x: 5, y: 5, width: 6, height: 6 };
        draw_box(&mut image, &bbox, BOX_COLOR, 2);
        // Left/top edge at 5, right/bottom edge at 5 + 6
        assert_eq!(*image.get_pixel(4, 8), BOX_COLOR);
        assert_eq!(*image.get_pixel(5, 8), BOX_COLOR);
        assert_eq!(*image.get_pixel(11, 8), BOX_COLOR);
        assert_eq!(*image.get_pixel(12, 8), BOX_COLOR);
        assert_eq!(*image.get_pixel(8, 4), BOX_COLOR);
        assert_eq!(*image.get_pixel(8, 12), BOX_COLOR);
        assert_eq!(*image.get_pixel(6, 8), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(3, 8), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(13, 8), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_box_clips_at_image_edges() {
        let mut image = RgbImage::new(10, 10);
        let bbox = BoundingBox { x: 0, y: 4, width: 9, height: 6 };
        draw_box(&mut image, &bbox, BOX_COLOR, 2);
        assert_eq!(*image.get_pixel(0, 6), BOX_COLOR);
        assert_eq!(*image.get_pixel(9, 6), BOX_COLOR);
        assert_eq!(*image.get_pixel(5, 4), BOX_COLOR);
        assert_eq!(*image.get_pixel(5, 6), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_process_empty_mask() {
        let frame = RgbImage::from_pixel(16, 16, Rgb([10, 20, 30]));
        let foreground = GrayImage::new(16, 16);
        let params = DetectionParams::default();

        let boxes = process(&frame, &foreground, &params, DisplayMode::Boxes);
        assert_eq!(boxes, frame);

        let mask = process(&frame, &foreground, &params, DisplayMode::Mask);
        assert!(mask.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_process_boxes_and_mask_modes() {
        let frame = RgbImage::from_pixel(200, 160, Rgb([50, 50, 50]));
        let foreground = mask_with(200, 160, &[(40, 30, 100, 100)]);
        let params = DetectionParams::default();

        let boxed = process(&frame, &foreground, &params, DisplayMode::Boxes);
        assert_eq!(*boxed.get_pixel(40, 80), BOX_COLOR);
        assert_eq!(*boxed.get_pixel(140, 80), BOX_COLOR);
        assert_eq!(*boxed.get_pixel(90, 80), Rgb([50, 50, 50]));

        let mask = process(&frame, &foreground, &params, DisplayMode::Mask);
        assert_eq!(*mask.get_pixel(90, 80), Rgb([255, 255, 255]));
        assert_eq!(*mask.get_pixel(5, 5), Rgb([0, 0, 0]));
    }
}
