// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Audio playback for the open video.
//!
//! The soundtrack is decoded to interleaved `f32` PCM by an `ffmpeg` child
//! process and streamed into a rodio [`Sink`] on the default output device.
//! The decoder thread hands PCM over in fixed-size chunks through a bounded
//! channel, so only a few chunks are ever held in memory. Volume, speed and
//! pause are the sink's own controls.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use thiserror::Error;

/// Fastest playback rate accepted by [`AudioOutput::set_rate`].
pub const MAX_RATE: f64 = 4.0;

/// Output format requested from the decoder.
pub const SAMPLE_RATE: u32 = 44_100;
pub const CHANNELS: u16 = 2;

/// Samples per chunk handed to the output (about 46 ms of stereo audio).
const CHUNK_SAMPLES: usize = 4096;
/// Chunks the decoder may run ahead of playback.
const BUFFERED_CHUNKS: usize = 32;
/// How long to wait for the decoder's first chunk.
const FIRST_CHUNK_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised by the audio channel.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device available: {0}")]
    NoDevice(String),
    #[error("audio stream error: {0}")]
    Stream(String),
    #[error("failed to start audio decoder: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("no audio stream in {0}")]
    NoAudio(PathBuf),
    #[error("playback rate {0} is not supported")]
    UnsupportedRate(f64),
}

/// Control surface of an audio player bound to one media file.
pub trait AudioOutput {
    /// Start or continue playback from the current position.
    fn play(&mut self);

    /// Suspend playback, keeping the position.
    fn pause(&mut self);

    /// Halt playback and return to position zero.
    fn stop(&mut self);

    /// Stop, then play from the start.
    fn restart(&mut self) {
        self.stop();
        self.play();
    }

    /// Volume in percent, clamped to 0..=100.
    fn set_volume(&mut self, volume: u8);

    /// Best-effort playback rate change.
    fn set_rate(&mut self, rate: f64) -> Result<(), AudioError>;

    /// True once each time the track runs out while playing.
    fn take_end_of_stream(&mut self) -> bool;
}

fn check_rate(rate: f64) -> Result<(), AudioError> {
    if rate.is_finite() && rate > 0.0 && rate <= MAX_RATE {
        Ok(())
    } else {
        Err(AudioError::UnsupportedRate(rate))
    }
}

fn gain(volume: u8) -> f32 {
    f32::from(volume.min(100)) / 100.0
}

/// Interpret little-endian `f32` bytes; a trailing partial sample is dropped.
fn decode_samples(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Fill `buffer` from `reader` until it is full or the stream ends.
fn read_full(reader: &mut impl Read, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Forward decoder output as sample chunks until EOF or the receiver hangs up.
fn pump_chunks(mut reader: impl Read, chunks: SyncSender<Vec<f32>>) {
    let mut buffer = vec![0u8; CHUNK_SAMPLES * 4];
    loop {
        let filled = match read_full(&mut reader, &mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                log::debug!("Audio decoder pipe closed: {}", e);
                break;
            }
        };

        let samples = decode_samples(&buffer[..filled]);
        if !samples.is_empty() && chunks.send(samples).is_err() {
            // Playback side was dropped
            return;
        }
        if filled < buffer.len() {
            break;
        }
    }
}

/// Interleaved PCM pulled chunk by chunk from the decoder thread.
pub struct PcmStream {
    chunks: Receiver<Vec<f32>>,
    current: std::vec::IntoIter<f32>,
}

impl PcmStream {
    fn new(first: Vec<f32>, chunks: Receiver<Vec<f32>>) -> Self {
        Self {
            chunks,
            current: first.into_iter(),
        }
    }
}

impl Iterator for PcmStream {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        loop {
            if let Some(sample) = self.current.next() {
                return Some(sample);
            }
            // Disconnected means the decoder finished
            self.current = self.chunks.recv().ok()?.into_iter();
        }
    }
}

impl Source for PcmStream {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        CHANNELS
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// The `ffmpeg` child decoding one pass over the soundtrack.
struct DecoderProcess(Child);

impl DecoderProcess {
    /// Start decoding `path` and wait for the first chunk of PCM.
    fn spawn(ffmpeg: &str, path: &Path) -> Result<(Self, PcmStream), AudioError> {
        let mut child = Command::new(ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-vn", "-f", "f32le", "-ac"])
            .arg(CHANNELS.to_string())
            .arg("-ar")
            .arg(SAMPLE_RATE.to_string())
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        // Owned from here so every early return reaps the child
        let stdout: Option<ChildStdout> = child.stdout.take();
        let process = Self(child);
        let stdout =
            stdout.ok_or_else(|| AudioError::Stream("decoder has no output pipe".to_string()))?;

        let (sender, receiver) = sync_channel(BUFFERED_CHUNKS);
        std::thread::Builder::new()
            .name("audio-decoder".to_string())
            .spawn(move || pump_chunks(stdout, sender))?;

        match receiver.recv_timeout(FIRST_CHUNK_TIMEOUT) {
            Ok(first) => Ok((process, PcmStream::new(first, receiver))),
            Err(RecvTimeoutError::Disconnected) => Err(AudioError::NoAudio(path.to_path_buf())),
            Err(RecvTimeoutError::Timeout) => {
                Err(AudioError::Stream("audio decoder produced no output".to_string()))
            }
        }
    }
}

impl Drop for DecoderProcess {
    fn drop(&mut self) {
        if let Err(e) = self.0.kill() {
            log::debug!("Audio decoder already exited: {}", e);
        }
        if let Err(e) = self.0.wait() {
            log::debug!("Failed to reap audio decoder: {}", e);
        }
    }
}

/// One pass of the track queued on its own sink.
struct Track {
    sink: Sink,
    _decoder: DecoderProcess,
}

/// Audio channel playing through a rodio sink on the default device.
pub struct SinkAudio {
    ffmpeg: String,
    path: PathBuf,
    _stream: OutputStream,
    handle: OutputStreamHandle,
    track: Option<Track>,
    volume: f32,
    rate: f32,
    playing: bool,
    end_reported: bool,
}

impl SinkAudio {
    /// Open the default device and start decoding the soundtrack of `path`.
    ///
    /// Fails with [`AudioError::NoAudio`] when the file has no audio stream.
    /// Playback stays paused until [`AudioOutput::play`].
    pub fn open(ffmpeg: &str, path: &Path, volume: u8) -> Result<Self, AudioError> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| AudioError::NoDevice(e.to_string()))?;

        let mut audio = Self {
            ffmpeg: ffmpeg.to_string(),
            path: path.to_path_buf(),
            _stream: stream,
            handle,
            track: None,
            volume: gain(volume),
            rate: 1.0,
            playing: false,
            end_reported: false,
        };
        audio.track = Some(audio.load_track()?);

        log::info!(
            "Audio opened: {} ({} Hz, {} ch)",
            path.display(),
            SAMPLE_RATE,
            CHANNELS
        );
        Ok(audio)
    }

    /// Queue a fresh decode of the track, paused at position zero.
    fn load_track(&self) -> Result<Track, AudioError> {
        let (decoder, pcm) = DecoderProcess::spawn(&self.ffmpeg, &self.path)?;
        let sink = Sink::try_new(&self.handle).map_err(|e| AudioError::Stream(e.to_string()))?;
        sink.pause();
        sink.set_volume(self.volume);
        sink.set_speed(self.rate);
        sink.append(pcm);
        Ok(Track {
            sink,
            _decoder: decoder,
        })
    }
}

impl AudioOutput for SinkAudio {
    fn play(&mut self) {
        if self.track.is_none() {
            match self.load_track() {
                Ok(track) => self.track = Some(track),
                Err(e) => {
                    log::warn!("Cannot restart audio for {}: {}", self.path.display(), e);
                    return;
                }
            }
            self.end_reported = false;
        }
        if let Some(track) = self.track.as_ref() {
            track.sink.play();
        }
        self.playing = true;
    }

    fn pause(&mut self) {
        if let Some(track) = self.track.as_ref() {
            track.sink.pause();
        }
        self.playing = false;
    }

    fn stop(&mut self) {
        if let Some(track) = self.track.take() {
            track.sink.stop();
        }
        self.playing = false;
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = gain(volume);
        if let Some(track) = self.track.as_ref() {
            track.sink.set_volume(self.volume);
        }
    }

    fn set_rate(&mut self, rate: f64) -> Result<(), AudioError> {
        check_rate(rate)?;
        self.rate = rate as f32;
        if let Some(track) = self.track.as_ref() {
            track.sink.set_speed(self.rate);
        }
        Ok(())
    }

    fn take_end_of_stream(&mut self) -> bool {
        let drained = self.track.as_ref().map_or(false, |track| track.sink.empty());
        if self.playing && drained && !self.end_reported {
            self.end_reported = true;
            return true;
        }
        false
    }
}
