//! Video decoding through an external `ffmpeg` binary.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::{InferenceError, Result};
use crate::types::Frame;

/// Splits an uploaded video into the inputs the journal models consume.
pub trait MediaDecoder: Send + Sync {
    /// Writes the audio track as 16 kHz mono PCM WAV into `out_dir`.
    fn extract_audio(&self, video: &Path, out_dir: &Path) -> Result<PathBuf>;

    /// Decodes every `every`-th frame (0, every, 2*every, ...).
    fn sample_frames(&self, video: &Path, every: usize) -> Result<Vec<Frame>>;
}

pub struct FfmpegDecoder {
    program: PathBuf,
    frame_size: u32,
}

impl FfmpegDecoder {
    /// `frame_size` is the side of the square grayscale frames produced.
    pub fn new<P: Into<PathBuf>>(program: P, frame_size: u32) -> Self {
        Self {
            program: program.into(),
            frame_size,
        }
    }

    fn run<I, S>(&self, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new(&self.program).args(args).output()?;
        if !output.status.success() {
            return Err(InferenceError::Command {
                program: self.program.display().to_string(),
                status: output.status.to_string(),
                stderr: tail(&output.stderr),
            });
        }
        Ok(output)
    }
}

impl MediaDecoder for FfmpegDecoder {
    fn extract_audio(&self, video: &Path, out_dir: &Path) -> Result<PathBuf> {
        let audio = out_dir.join("audio.wav");
        self.run([
            OsStr::new("-hide_banner"),
            OsStr::new("-loglevel"),
            OsStr::new("error"),
            OsStr::new("-i"),
            video.as_os_str(),
            OsStr::new("-vn"),
            OsStr::new("-acodec"),
            OsStr::new("pcm_s16le"),
            OsStr::new("-ar"),
            OsStr::new("16000"),
            OsStr::new("-ac"),
            OsStr::new("1"),
            OsStr::new("-y"),
            audio.as_os_str(),
        ])?;
        log::debug!("Extracted audio track to {}", audio.display());
        Ok(audio)
    }

    fn sample_frames(&self, video: &Path, every: usize) -> Result<Vec<Frame>> {
        let every = every.max(1);
        let size = self.frame_size;
        let filter = format!("select=not(mod(n\\,{every})),scale={size}:{size},format=gray");
        let output = self.run([
            OsStr::new("-hide_banner"),
            OsStr::new("-loglevel"),
            OsStr::new("error"),
            OsStr::new("-i"),
            video.as_os_str(),
            OsStr::new("-vf"),
            OsStr::new(&filter),
            OsStr::new("-vsync"),
            OsStr::new("0"),
            OsStr::new("-f"),
            OsStr::new("rawvideo"),
            OsStr::new("-pix_fmt"),
            OsStr::new("gray"),
            OsStr::new("-"),
        ])?;
        let frames = split_frames(&output.stdout, size, size, every);
        log::debug!("Sampled {} frames from {}", frames.len(), video.display());
        Ok(frames)
    }
}

/// Cuts a raw `gray` byte stream into frames. A trailing partial frame is
/// dropped.
pub fn split_frames(raw: &[u8], width: u32, height: u32, every: usize) -> Vec<Frame> {
    let frame_len = (width * height) as usize;
    if frame_len == 0 {
        return Vec::new();
    }
    raw.chunks_exact(frame_len)
        .enumerate()
        .map(|(i, pixels)| Frame {
            index: i * every,
            width,
            height,
            pixels: pixels.to_vec(),
        })
        .collect()
}

fn tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    match text.char_indices().rev().nth(499) {
        Some((start, _)) => text[start..].to_string(),
        None => text.to_string(),
    }
}
