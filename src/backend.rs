// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Factories for the per-session media components.
//!
//! The player asks a backend for a frame source, a background model and an
//! audio channel each time a video is opened.

use std::path::Path;

use crate::config::Config;
use crate::io::audio::{AudioError, AudioOutput, SinkAudio};
use crate::io::media::{FfmpegSource, FfmpegTools, FrameSource, MediaError};
use crate::vision::background::{BackgroundModel, DetectError, GaussianBackground, ModelSettings};

/// Creates the components of a new session.
pub trait MediaBackend {
    fn open_frames(&self, path: &Path) -> Result<Box<dyn FrameSource>, MediaError>;

    fn open_audio(&self, path: &Path, volume: u8) -> Result<Box<dyn AudioOutput>, AudioError>;

    fn create_detector(&self, threshold: u8) -> Result<Box<dyn BackgroundModel>, DetectError>;
}

/// ffmpeg decoding with the built-in background model.
pub struct FfmpegBackend {
    tools: FfmpegTools,
    model: ModelSettings,
}

impl FfmpegBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            tools: config.tools(),
            model: config.model(),
        }
    }
}

impl MediaBackend for FfmpegBackend {
    fn open_frames(&self, path: &Path) -> Result<Box<dyn FrameSource>, MediaError> {
        Ok(Box::new(FfmpegSource::open(&self.tools, path)?))
    }

    fn open_audio(&self, path: &Path, volume: u8) -> Result<Box<dyn AudioOutput>, AudioError> {
        Ok(Box::new(SinkAudio::open(&self.tools.ffmpeg, path, volume)?))
    }

    fn create_detector(&self, _threshold: u8) -> Result<Box<dyn BackgroundModel>, DetectError> {
        Ok(Box::new(GaussianBackground::new(self.model)))
    }
}

/// OpenCV capture and MOG2 background subtraction.
#[cfg(feature = "video-opencv")]
pub struct OpenCvBackend {
    ffmpeg: String,
    model: ModelSettings,
}

#[cfg(feature = "video-opencv")]
impl OpenCvBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            ffmpeg: config.ffmpeg.clone(),
            model: config.model(),
        }
    }
}

#[cfg(feature = "video-opencv")]
impl MediaBackend for OpenCvBackend {
    fn open_frames(&self, path: &Path) -> Result<Box<dyn FrameSource>, MediaError> {
        Ok(Box::new(crate::io::capture::CaptureSource::open(path)?))
    }

    fn open_audio(&self, path: &Path, volume: u8) -> Result<Box<dyn AudioOutput>, AudioError> {
        Ok(Box::new(SinkAudio::open(&self.ffmpeg, path, volume)?))
    }

    fn create_detector(&self, threshold: u8) -> Result<Box<dyn BackgroundModel>, DetectError> {
        Ok(Box::new(crate::vision::mog2::Mog2Background::new(
            self.model, threshold,
        )?))
    }
}

/// Backend selected by the enabled cargo features.
pub fn default_backend(config: &Config) -> Box<dyn MediaBackend> {
    #[cfg(feature = "video-opencv")]
    {
        Box::new(OpenCvBackend::new(config))
    }
    #[cfg(not(feature = "video-opencv"))]
    {
        Box::new(FfmpegBackend::new(config))
    }
}
