// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations for video frames and audio.

pub mod audio;
pub mod media;
#[cfg(feature = "video-opencv")]
pub mod capture;
