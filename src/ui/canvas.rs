// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Video display area.
//!
//! Shows the most recent display frame scaled to fit the panel, or a
//! welcome message when no video is open.

/// Size of an image of `image_size` fitted inside `available`, keeping aspect ratio.
pub fn fit_size(image_size: (u32, u32), available: egui::Vec2) -> egui::Vec2 {
    let (img_width, img_height) = image_size;
    if img_width == 0 || img_height == 0 || available.x <= 0.0 || available.y <= 0.0 {
        return egui::Vec2::ZERO;
    }

    let img_aspect = img_width as f32 / img_height as f32;
    let available_aspect = available.x / available.y;

    if img_aspect > available_aspect {
        // Image is wider - fit to width
        egui::vec2(available.x, available.x / img_aspect)
    } else {
        // Image is taller - fit to height
        egui::vec2(available.y * img_aspect, available.y)
    }
}

/// Display the video canvas.
pub fn show(
    ui: &mut egui::Ui,
    texture: &Option<egui::TextureHandle>,
    image_size: Option<(u32, u32)>,
    status: &str,
) {
    let available_size = ui.available_size() - egui::vec2(0.0, 24.0);

    egui::Frame::canvas(ui.style())
        .fill(egui::Color32::BLACK)
        .show(ui, |ui| {
            ui.set_min_size(available_size.max(egui::Vec2::ZERO));

            match (texture, image_size) {
                (Some(texture), Some(size)) => {
                    let available = ui.available_size();
                    let display = fit_size(size, available);

                    // Center the frame
                    let offset = (available - display) / 2.0;
                    let image_rect =
                        egui::Rect::from_min_size(ui.min_rect().min + offset, display);

                    ui.painter().image(
                        texture.id(),
                        image_rect,
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        egui::Color32::WHITE,
                    );
                }
                _ => {
                    ui.centered_and_justified(|ui| {
                        ui.label(
                            egui::RichText::new("Open a video to start motion tracking")
                                .color(egui::Color32::from_gray(180)),
                        );
                    });
                }
            }
        });

    ui.horizontal(|ui| {
        ui.label(status);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_wide_image() {
        let size = fit_size((1920, 1080), egui::vec2(800.0, 800.0));
        assert_eq!(size.x, 800.0);
        assert!((size.y - 450.0).abs() < 0.01);
    }

    #[test]
    fn test_fit_tall_image() {
        let size = fit_size((480, 640), egui::vec2(1000.0, 320.0));
        assert_eq!(size.y, 320.0);
        assert!((size.x - 240.0).abs() < 0.01);
    }

    #[test]
    fn test_fit_degenerate() {
        assert_eq!(fit_size((0, 10), egui::vec2(100.0, 100.0)), egui::Vec2::ZERO);
        assert_eq!(fit_size((10, 10), egui::vec2(0.0, 100.0)), egui::Vec2::ZERO);
    }
}
