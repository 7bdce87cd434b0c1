// Media processing over external ffmpeg/ffprobe binaries
//
// - Commands: argument builders for every ffmpeg/ffprobe invocation
// - Processor: executes those commands and interprets their output

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use commands::*;
pub use processor::*;

use crate::burn::SubtitleStyle;
use crate::checksum::{HashAlgorithm, StreamChecksum};
use crate::config::MediaConfig;
use crate::error::Result;

/// Audio container/codec produced by audio extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Mp3,
    M4a,
    Flac,
    Ogg,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
        }
    }

    pub fn codec_args(&self) -> &'static [&'static str] {
        match self {
            AudioFormat::Wav => &["-acodec", "pcm_s16le"],
            AudioFormat::Mp3 => &["-acodec", "libmp3lame", "-q:a", "2"],
            AudioFormat::M4a => &["-acodec", "aac", "-b:a", "192k"],
            AudioFormat::Flac => &["-acodec", "flac"],
            AudioFormat::Ogg => &["-acodec", "libvorbis", "-q:a", "5"],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioOptions {
    pub format: AudioFormat,
    /// Resample to this rate; `None` keeps the source rate
    pub sample_rate: Option<u32>,
    /// Downmix to a single channel
    pub mono: bool,
}

impl AudioOptions {
    /// 16 kHz mono PCM, what whisper expects
    pub fn for_transcription() -> Self {
        Self {
            format: AudioFormat::Wav,
            sample_rate: Some(16000),
            mono: true,
        }
    }
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            format: AudioFormat::Wav,
            sample_rate: None,
            mono: false,
        }
    }
}

/// Main trait for media processing operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Copy all streams into `output` without any metadata or chapters
    async fn strip_metadata(&self, input: &Path, output: &Path) -> Result<()>;

    /// Copy all streams into `output` with the `comment` tag replaced
    async fn set_comment(&self, input: &Path, output: &Path, comment: &str) -> Result<()>;

    /// Extract audio from video
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path, options: &AudioOptions) -> Result<()>;

    /// Burn subtitles into video file
    async fn burn_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
        style: &SubtitleStyle,
    ) -> Result<()>;

    /// Raw ffprobe JSON describing format and streams
    async fn probe_raw(&self, input: &Path) -> Result<String>;

    /// Per-stream checksums
    async fn stream_checksums(&self, input: &Path, algorithm: HashAlgorithm) -> Result<Vec<StreamChecksum>>;

    /// Write one frame at `at_seconds`, filtered through `crop_filter`, to `image_path`
    async fn extract_frame(
        &self,
        video_path: &Path,
        at_seconds: f64,
        crop_filter: &str,
        image_path: &Path,
    ) -> Result<()>;

    /// Get ffmpeg and ffprobe version lines
    async fn get_version_info(&self) -> Result<String>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::MediaProcessorImpl::new(config))
    }
}
