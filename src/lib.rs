//! vidtools - video file maintenance on top of external tools
//!
//! Metadata removal, comment tagging, audio extraction, speech transcription,
//! probing, per-stream checksums, watermark detection and subtitle burn-in,
//! delegating the media work to ffmpeg, ffprobe, whisper and tesseract.

pub mod burn;
pub mod checksum;
pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod paths;
pub mod probe;
pub mod subtitle;
pub mod transcribe;
pub mod watermark;
pub mod workflow;
