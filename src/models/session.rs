// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! The open video session.
//!
//! A session owns everything acquired for one video: the frame source, the
//! background model and the (optional) audio channel. It is created by a
//! successful open and released as a whole on quit or on the next open.

use std::path::{Path, PathBuf};

use image::{GrayImage, RgbImage};

use crate::io::audio::AudioOutput;
use crate::io::media::FrameSource;
use crate::vision::background::{BackgroundModel, DetectError};

/// Transport state of the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    NoSession,
    Playing,
    Paused,
}

/// Resources held for the currently open video.
pub struct Session {
    path: PathBuf,
    source: Box<dyn FrameSource>,
    detector: Box<dyn BackgroundModel>,
    audio: Option<Box<dyn AudioOutput>>,
    released: bool,
}

impl Session {
    pub fn new(
        path: PathBuf,
        source: Box<dyn FrameSource>,
        detector: Box<dyn BackgroundModel>,
        audio: Option<Box<dyn AudioOutput>>,
    ) -> Self {
        Self {
            path,
            source,
            detector,
            audio,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn audio_mut(&mut self) -> Option<&mut (dyn AudioOutput + 'static)> {
        self.audio.as_deref_mut()
    }

    /// Next frame, looping back to the first one at end of stream.
    ///
    /// A read error is treated like end of stream. Returns `None` when the
    /// source still yields nothing after rewinding.
    pub fn next_frame(&mut self) -> Option<RgbImage> {
        match self.source.read() {
            Ok(Some(frame)) => return Some(frame),
            Ok(None) => {}
            Err(e) => log::debug!("Frame read failed, rewinding: {}", e),
        }

        if let Err(e) = self.source.rewind() {
            log::warn!("Rewind failed for {}: {}", self.path.display(), e);
            return None;
        }

        match self.source.read() {
            Ok(frame) => frame,
            Err(e) => {
                log::debug!("Frame read failed after rewind: {}", e);
                None
            }
        }
    }

    /// Run the background model on `frame` at the current threshold.
    pub fn detect(&mut self, frame: &RgbImage, threshold: u8) -> Result<GrayImage, DetectError> {
        self.detector.apply(frame, threshold)
    }

    /// Stop audio and release the frame source. Safe to call repeatedly.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        self.source.release();
        if let Some(audio) = self.audio.as_deref_mut() {
            audio.stop();
        }
        // Dropping the audio output closes its device stream
        self.audio = None;

        log::info!("Session closed: {}", self.path.display());
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}
