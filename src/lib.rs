//! mkvtomp4 - Batch MKV to MP4 remuxing
//!
//! Converts MKV containers to MP4 by driving ffprobe, ffmpeg and mp4fpsmod:
//! streams are copied without re-encoding, known frame rates are patched
//! into the output and allow-listed subtitles are written as SRT sidecars.

pub mod cli;
pub mod config;
pub mod workflow;
pub mod scanner;
pub mod probe;
pub mod progress;
pub mod framerate;
pub mod subtitle;
pub mod media;
pub mod error;
pub mod setup;
