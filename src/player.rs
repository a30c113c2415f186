// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Playback controller.
//!
//! `Player` owns the session, the live parameters and the tick schedule.
//! Every control action goes through it, and the UI calls [`Player::tick`]
//! once per repaint to advance the frame loop.

use std::path::Path;
use std::time::Instant;

use image::RgbImage;
use thiserror::Error;

use crate::backend::MediaBackend;
use crate::io::media::{has_video_extension, MediaError};
use crate::models::params::{DetectionParams, DisplayMode, PlaybackParams};
use crate::models::session::{PlaybackState, Session};
use crate::scheduler::{tick_delay, RepeatingTask};
use crate::vision;
use crate::vision::background::DetectError;

/// Reasons a video could not be opened.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("cannot create background model: {0}")]
    Detector(#[from] DetectError),
}

/// Drives one video session at a time.
pub struct Player {
    backend: Box<dyn MediaBackend>,
    session: Option<Session>,
    state: PlaybackState,
    detection: DetectionParams,
    playback: PlaybackParams,
    mode: DisplayMode,
    task: RepeatingTask,
    base_delay_ms: u64,
    frames_processed: u64,
}

impl Player {
    pub fn new(
        backend: Box<dyn MediaBackend>,
        detection: DetectionParams,
        playback: PlaybackParams,
        base_delay_ms: u64,
    ) -> Self {
        Self {
            backend,
            session: None,
            state: PlaybackState::NoSession,
            detection,
            playback,
            mode: DisplayMode::default(),
            task: RepeatingTask::new(),
            base_delay_ms,
            frames_processed: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    #[cfg(test)]
    pub fn playback(&self) -> PlaybackParams {
        self.playback
    }

    pub fn session_path(&self) -> Option<&Path> {
        self.session.as_ref().map(Session::path)
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Pause/resume is only meaningful with an open video.
    pub fn can_pause(&self) -> bool {
        self.state != PlaybackState::NoSession
    }

    /// Label for the transport button.
    pub fn pause_label(&self) -> &'static str {
        match self.state {
            PlaybackState::Paused => "Play",
            _ => "Pause",
        }
    }

    /// Deadline of the next scheduled tick.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.task.next_deadline()
    }

    /// Open `path`, replacing any current session.
    ///
    /// The previous session is torn down before the new one is attempted,
    /// so a failed open leaves the player with no session.
    pub fn open(&mut self, path: &Path, now: Instant) -> Result<(), OpenError> {
        self.close_session();

        if !has_video_extension(path) {
            log::error!("Not a video file: {}", path.display());
            return Err(MediaError::Unsupported(path.to_path_buf()).into());
        }

        let source = self.backend.open_frames(path).map_err(|e| {
            log::error!("Cannot open video {}: {}", path.display(), e);
            e
        })?;
        let detector = self.backend.create_detector(self.detection.mask_threshold)?;
        let audio = match self.backend.open_audio(path, self.playback.volume()) {
            Ok(audio) => Some(audio),
            Err(e) => {
                log::warn!("Audio unavailable for {}: {}", path.display(), e);
                None
            }
        };

        let (width, height) = source.dimensions();
        let mut session = Session::new(path.to_path_buf(), source, detector, audio);
        let speed = self.playback.speed();
        if let Some(audio) = session.audio_mut() {
            if let Err(e) = audio.set_rate(speed) {
                log::debug!("Ignoring audio rate {}: {}", speed, e);
            }
            audio.play();
        }

        log::info!("Playing {} ({}x{})", path.display(), width, height);
        self.session = Some(session);
        self.state = PlaybackState::Playing;
        self.frames_processed = 0;
        self.task.schedule(now);
        Ok(())
    }

    /// Suspend the frame loop and audio. No-op unless playing.
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.state = PlaybackState::Paused;
        self.task.cancel();
        if let Some(audio) = self.session.as_mut().and_then(Session::audio_mut) {
            audio.pause();
        }
        log::info!("Paused");
    }

    /// Continue the frame loop and audio. No-op unless paused.
    pub fn resume(&mut self, now: Instant) {
        if self.state != PlaybackState::Paused {
            return;
        }
        self.state = PlaybackState::Playing;
        if let Some(audio) = self.session.as_mut().and_then(Session::audio_mut) {
            audio.play();
        }
        self.task.schedule(now);
        log::info!("Resumed");
    }

    pub fn toggle_pause(&mut self, now: Instant) {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.resume(now),
            PlaybackState::NoSession => {}
        }
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
        log::info!("Display mode: {:?}", self.mode);
    }

    pub fn set_mask_threshold(&mut self, threshold: u8) {
        self.detection.mask_threshold = threshold;
    }

    pub fn set_min_area(&mut self, min_area: u32) {
        self.detection.set_min_area(min_area);
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.playback.set_volume(volume);
        let volume = self.playback.volume();
        if let Some(audio) = self.session.as_mut().and_then(Session::audio_mut) {
            audio.set_volume(volume);
        }
    }

    /// Change playback speed; the audio rate follows on a best-effort basis.
    pub fn set_speed(&mut self, speed: f64) {
        self.playback.set_speed(speed);
        let speed = self.playback.speed();
        if let Some(audio) = self.session.as_mut().and_then(Session::audio_mut) {
            if let Err(e) = audio.set_rate(speed) {
                log::debug!("Ignoring audio rate {}: {}", speed, e);
            }
        }
    }

    /// Restart audio that reached its end while playing.
    fn service_audio(&mut self) {
        let playing = self.state == PlaybackState::Playing;
        if let Some(audio) = self.session.as_mut().and_then(Session::audio_mut) {
            if audio.take_end_of_stream() && playing {
                log::debug!("Audio reached end, restarting");
                audio.restart();
            }
        }
    }

    /// Run one tick of the frame loop if one is due.
    ///
    /// Returns the frame to display, or `None` when nothing was due or the
    /// source ran dry even after rewinding (the loop then stays halted).
    pub fn tick(&mut self, now: Instant) -> Option<RgbImage> {
        self.service_audio();

        if self.state != PlaybackState::Playing || !self.task.poll(now) {
            return None;
        }

        let session = self.session.as_mut()?;
        let Some(frame) = session.next_frame() else {
            log::debug!("No frame available after rewind; playback halted");
            return None;
        };

        let display = match session.detect(&frame, self.detection.mask_threshold) {
            Ok(foreground) => vision::render(&frame, &foreground, &self.detection, self.mode),
            Err(e) => {
                log::warn!("Detection failed: {}", e);
                frame
            }
        };

        self.frames_processed += 1;
        self.task
            .schedule_after(now, tick_delay(self.base_delay_ms, self.playback.speed()));
        Some(display)
    }

    /// Stop everything and release the session.
    pub fn quit(&mut self) {
        self.close_session();
        log::info!("Player stopped");
    }

    fn close_session(&mut self) {
        self.task.cancel();
        if let Some(mut session) = self.session.take() {
            session.release();
        }
        self.state = PlaybackState::NoSession;
    }
}
