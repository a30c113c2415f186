// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! This module wires the toolbar, canvas and sliders to the [`Player`],
//! drives the player's tick from the egui frame loop and uploads each
//! display frame as a texture.

use std::time::{Duration, Instant};

use image::RgbImage;

use crate::backend::default_backend;
use crate::config::Config;
use crate::io::media::VIDEO_EXTENSIONS;
use crate::models::session::PlaybackState;
use crate::player::Player;
use crate::ui::controls::SliderValues;
use crate::ui::toolbar::ToolbarAction;
use crate::ui::{canvas, controls, toolbar};

/// Repaint interval while playing but with no tick pending, so audio
/// end-of-stream events are still serviced.
const IDLE_REPAINT: Duration = Duration::from_millis(100);

/// Main application state.
pub struct MotionTrackerApp {
    player: Player,

    /// Current slider positions
    sliders: SliderValues,

    /// Texture holding the last display frame
    texture: Option<egui::TextureHandle>,

    /// Display frame dimensions (width, height)
    frame_size: Option<(u32, u32)>,
}

impl MotionTrackerApp {
    /// Create the application from launch settings.
    pub fn new(config: &Config) -> Self {
        let detection = config.detection();
        let playback = config.playback();

        Self {
            player: Player::new(
                default_backend(config),
                detection,
                playback,
                config.base_delay_ms,
            ),
            sliders: SliderValues {
                mask_threshold: detection.mask_threshold,
                min_area: detection.min_area,
                volume: playback.volume(),
                speed: playback.speed(),
            },
            texture: None,
            frame_size: None,
        }
    }

    /// Ask for a video file and start playing it.
    fn open_video(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_title("Select video file")
            .add_filter("Video files", &VIDEO_EXTENSIONS)
            .pick_file()
        else {
            return;
        };

        if let Err(e) = self.player.open(&path, Instant::now()) {
            log::error!("Failed to open {}: {}", path.display(), e);
            self.texture = None;
            self.frame_size = None;
            rfd::MessageDialog::new()
                .set_level(rfd::MessageLevel::Error)
                .set_title("Error")
                .set_description("Cannot open video.")
                .set_buttons(rfd::MessageButtons::Ok)
                .show();
        }
    }

    /// Replace the displayed texture with `frame`.
    fn show_frame(&mut self, ctx: &egui::Context, frame: RgbImage) {
        let (width, height) = frame.dimensions();
        let image = egui::ColorImage::from_rgb([width as usize, height as usize], frame.as_raw());

        match self.texture.as_mut() {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.texture =
                    Some(ctx.load_texture("video_frame", image, egui::TextureOptions::LINEAR));
            }
        }
        self.frame_size = Some((width, height));
    }

    fn apply_sliders(&mut self, changes: controls::SliderChanges) {
        if changes.mask_threshold {
            self.player.set_mask_threshold(self.sliders.mask_threshold);
        }
        if changes.min_area {
            self.player.set_min_area(self.sliders.min_area);
        }
        if changes.volume {
            self.player.set_volume(self.sliders.volume);
        }
        if changes.speed {
            self.player.set_speed(self.sliders.speed);
        }
    }

    fn status_text(&self) -> String {
        let Some(path) = self.player.session_path() else {
            return "No video loaded".to_string();
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let state = match self.player.state() {
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
            PlaybackState::NoSession => "Stopped",
        };

        format!("{} | {} | frame {}", name, state, self.player.frames_processed())
    }
}

impl eframe::App for MotionTrackerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Window close behaves like Quit
        if ctx.input(|i| i.viewport().close_requested()) {
            self.player.quit();
        }

        if let Some(frame) = self.player.tick(Instant::now()) {
            self.show_frame(ctx, frame);
        }

        // Top toolbar
        let action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| {
                toolbar::show(
                    ui,
                    self.player.mode().toggle_label(),
                    self.player.pause_label(),
                    self.player.can_pause(),
                )
            })
            .inner;

        match action {
            ToolbarAction::Open => self.open_video(),
            ToolbarAction::ToggleMode => self.player.toggle_mode(),
            ToolbarAction::TogglePause => self.player.toggle_pause(Instant::now()),
            ToolbarAction::Quit => {
                self.player.quit();
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
            ToolbarAction::None => {}
        }

        // Bottom sliders
        let changes = egui::TopBottomPanel::bottom("controls")
            .show(ctx, |ui| controls::show(ui, &mut self.sliders))
            .inner;
        self.apply_sliders(changes);

        // Video canvas
        let status = self.status_text();
        egui::CentralPanel::default().show(ctx, |ui| {
            canvas::show(ui, &self.texture, self.frame_size, &status);
        });

        // Wake up for the next tick
        let now = Instant::now();
        match self.player.next_deadline() {
            Some(deadline) => ctx.request_repaint_after(deadline.saturating_duration_since(now)),
            None if self.player.state() == PlaybackState::Playing => {
                ctx.request_repaint_after(IDLE_REPAINT)
            }
            None => {}
        }
    }
}
