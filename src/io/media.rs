// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Video frame sources.
//!
//! This module handles opening video files and pulling decoded RGB frames
//! from them one at a time. Decoding is delegated to an `ffmpeg` child
//! process writing raw `rgb24` frames to a pipe; rewinding restarts the
//! child from position zero.

use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use image::RgbImage;
use thiserror::Error;

/// Video file extensions offered by the open dialog.
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];

/// Errors raised while opening or decoding a video.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("not a supported video file: {0}")]
    Unsupported(PathBuf),
    #[error("cannot read video stream info: {0}")]
    Metadata(String),
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "video-opencv")]
    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),
}

/// A sequential supply of decoded frames.
pub trait FrameSource {
    /// Next frame, or `None` at end of stream.
    fn read(&mut self) -> Result<Option<RgbImage>, MediaError>;

    /// Seek back to the first frame.
    fn rewind(&mut self) -> Result<(), MediaError>;

    /// Release decoder resources. Calling it again is a no-op.
    fn release(&mut self);

    /// Frame size in pixels.
    fn dimensions(&self) -> (u32, u32);
}

/// Whether `path` carries one of the accepted video extensions.
pub fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Paths of the external decoder tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegTools {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for FfmpegTools {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

/// Read the first video stream's display dimensions with `ffprobe`.
///
/// ffmpeg applies rotation metadata while decoding, so a stream tagged with
/// a quarter turn is reported with width and height swapped.
pub fn stream_dimensions(ffprobe: &str, path: &Path) -> Result<(u32, u32), MediaError> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height:stream_tags=rotate:stream_side_data=rotation",
            "-of",
            "default=noprint_wrappers=1",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| MediaError::Spawn {
            program: ffprobe.to_string(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::Metadata(stderr.trim().to_string()));
    }

    parse_dimensions(&String::from_utf8_lossy(&output.stdout))
}

/// Parse ffprobe's `key=value` stream report into display dimensions.
fn parse_dimensions(text: &str) -> Result<(u32, u32), MediaError> {
    let mut width = None;
    let mut height = None;
    let mut rotation = 0i64;

    for (key, value) in text.lines().filter_map(|l| l.trim().split_once('=')) {
        let value = value.trim();
        let number = || {
            value
                .parse::<u32>()
                .map_err(|_| MediaError::Metadata(format!("bad {}: {}", key, value)))
        };
        match key {
            "width" => width = Some(number()?),
            "height" => height = Some(number()?),
            "rotation" | "TAG:rotate" => {
                // Side data may carry a fraction such as "-90.00"
                if let Ok(degrees) = value.parse::<f64>() {
                    rotation = degrees.round() as i64;
                }
            }
            _ => {}
        }
    }

    let (Some(width), Some(height)) = (width, height) else {
        return Err(MediaError::Metadata("no video stream".to_string()));
    };
    if width == 0 || height == 0 {
        return Err(MediaError::InvalidDimensions { width, height });
    }

    if rotation.rem_euclid(180) == 90 {
        Ok((height, width))
    } else {
        Ok((width, height))
    }
}

/// Frames decoded by an `ffmpeg` child process.
pub struct FfmpegSource {
    ffmpeg: String,
    path: PathBuf,
    width: u32,
    height: u32,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
}

impl FfmpegSource {
    /// Read the stream dimensions of `path` and start decoding from the first frame.
    pub fn open(tools: &FfmpegTools, path: &Path) -> Result<Self, MediaError> {
        if !path.is_file() {
            return Err(MediaError::NotFound(path.to_path_buf()));
        }

        let (width, height) = stream_dimensions(&tools.ffprobe, path)?;

        let mut source = Self {
            ffmpeg: tools.ffmpeg.clone(),
            path: path.to_path_buf(),
            width,
            height,
            child: None,
            stdout: None,
        };
        source.spawn()?;

        log::info!("Opened video: {} ({}x{})", path.display(), width, height);
        Ok(source)
    }

    fn spawn(&mut self) -> Result<(), MediaError> {
        let mut child = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(&self.path)
            .args(["-map", "0:v:0", "-an", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| MediaError::Spawn {
                program: self.ffmpeg.clone(),
                source,
            })?;

        self.stdout = child.stdout.take();
        self.child = Some(child);
        Ok(())
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

impl FrameSource for FfmpegSource {
    fn read(&mut self) -> Result<Option<RgbImage>, MediaError> {
        let len = self.frame_len();
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buffer = vec![0u8; len];
        match stdout.read_exact(&mut buffer) {
            Ok(()) => {}
            // A truncated trailing frame counts as end of stream
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(MediaError::Io(e)),
        }

        RgbImage::from_raw(self.width, self.height, buffer)
            .map(Some)
            .ok_or_else(|| MediaError::Decode("short frame buffer".to_string()))
    }

    fn rewind(&mut self) -> Result<(), MediaError> {
        self.release();
        self.spawn()
    }

    fn release(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                log::debug!("ffmpeg already exited: {}", e);
            }
            if let Err(e) = child.wait() {
                log::debug!("Failed to reap ffmpeg: {}", e);
            }
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.release();
    }
}

/// Frames held in memory.
#[cfg(test)]
pub struct FrameSequence {
    frames: Vec<RgbImage>,
    position: usize,
    released: bool,
}

#[cfg(test)]
impl FrameSequence {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self {
            frames,
            position: 0,
            released: false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

#[cfg(test)]
impl FrameSource for FrameSequence {
    fn read(&mut self) -> Result<Option<RgbImage>, MediaError> {
        if self.released {
            return Ok(None);
        }
        let frame = self.frames.get(self.position).cloned();
        if frame.is_some() {
            self.position += 1;
        }
        Ok(frame)
    }

    fn rewind(&mut self) -> Result<(), MediaError> {
        self.position = 0;
        Ok(())
    }

    fn release(&mut self) {
        self.released = true;
        self.frames.clear();
    }

    fn dimensions(&self) -> (u32, u32) {
        self.frames
            .first()
            .map(|f| f.dimensions())
            .unwrap_or((0, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn numbered(n: u8) -> RgbImage {
        RgbImage::from_pixel(2, 2, Rgb([n, n, n]))
    }

    #[test]
    fn test_video_extensions() {
        assert!(has_video_extension(Path::new("clip.mp4")));
        assert!(has_video_extension(Path::new("/tmp/CLIP.MKV")));
        assert!(has_video_extension(Path::new("a.b.mov")));
        assert!(!has_video_extension(Path::new("notes.txt")));
        assert!(!has_video_extension(Path::new("noext")));
    }

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("width=1920\nheight=1080\n").unwrap(), (1920, 1080));
        assert!(matches!(parse_dimensions(""), Err(MediaError::Metadata(_))));
        assert!(matches!(parse_dimensions("width=abc\nheight=4"), Err(MediaError::Metadata(_))));
        assert!(matches!(
            parse_dimensions("width=0\nheight=480"),
            Err(MediaError::InvalidDimensions { width: 0, height: 480 })
        ));
    }

    #[test]
    fn test_quarter_turn_swaps_dimensions() {
        let side_data = "width=1920\nheight=1080\nrotation=-90\n";
        assert_eq!(parse_dimensions(side_data).unwrap(), (1080, 1920));

        let tagged = "width=1920\nheight=1080\nTAG:rotate=270\n";
        assert_eq!(parse_dimensions(tagged).unwrap(), (1080, 1920));

        let upside_down = "width=1920\nheight=1080\nrotation=180\n";
        assert_eq!(parse_dimensions(upside_down).unwrap(), (1920, 1080));
    }

    #[test]
    fn test_open_missing_file() {
        let tools = FfmpegTools::default();
        let err = FfmpegSource::open(&tools, Path::new("/definitely/not/here.mp4"))
            .err()
            .unwrap();
        assert!(matches!(err, MediaError::NotFound(_)));
    }

    #[test]
    fn test_sequence_rewinds_to_first_frame() {
        let mut source = FrameSequence::new((0..3).map(numbered).collect());
        for n in 0..3 {
            assert_eq!(source.read().unwrap().unwrap(), numbered(n));
        }
        assert!(source.read().unwrap().is_none());

        source.rewind().unwrap();
        assert_eq!(source.read().unwrap().unwrap(), numbered(0));
    }

    #[test]
    fn test_sequence_release_is_idempotent() {
        let mut source = FrameSequence::new(vec![numbered(1)]);
        assert_eq!(source.dimensions(), (2, 2));
        source.release();
        source.release();
        assert!(source.is_released());
        assert!(source.read().unwrap().is_none());
    }
}
