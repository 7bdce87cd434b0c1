use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::burn::{SubtitlePosition, SubtitleStyle};
use crate::checksum::HashAlgorithm;
use crate::media::AudioFormat;
use crate::subtitle::TranscriptFormat;

#[derive(Parser, Debug)]
#[command(author, version, about = "Video maintenance tasks on top of ffmpeg, whisper and tesseract", long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Remove all metadata and chapters (streams are copied, not re-encoded)
    StripMetadata {
        /// Video files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory (default: <dir>/clean)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Rewrite the comment tag
    SetComment {
        /// Video files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// New comment; a random UUID per file when omitted
        #[arg(short = 'm', long)]
        comment: Option<String>,

        /// Output directory (default: <dir>/tagged)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Extract the audio track
    ExtractAudio {
        /// Input video file
        input: PathBuf,

        /// Output audio file (default: <dir>/audio/<stem>.<format>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Audio format
        #[arg(short, long, value_enum, default_value_t = AudioFormat::Wav)]
        format: AudioFormat,

        /// Resample to this rate in Hz
        #[arg(long)]
        sample_rate: Option<u32>,

        /// Downmix to mono
        #[arg(long)]
        mono: bool,
    },

    /// Transcribe speech into text or subtitles
    Transcribe {
        /// Input video or audio file
        input: PathBuf,

        /// Output file (default: <dir>/transcripts/<stem>.<format>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = TranscriptFormat::Srt)]
        format: TranscriptFormat,

        #[command(flatten)]
        whisper: WhisperArgs,
    },

    /// Print format and stream information
    Info {
        /// Input media file
        input: PathBuf,

        /// Print ffprobe's raw JSON instead of the report
        #[arg(long)]
        json: bool,
    },

    /// Render an ffprobe JSON document as a readable report
    ParseMetadata {
        /// JSON file; read from stdin when omitted
        json_file: Option<PathBuf>,
    },

    /// Per-stream checksums
    Checksum {
        /// Video files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Hash algorithm
        #[arg(long = "hash", value_enum, default_value_t = HashAlgorithm::Md5)]
        algorithm: HashAlgorithm,

        /// Print JSON reports
        #[arg(long)]
        json: bool,
    },

    /// Look for burned-in watermark text in the frame corners
    DetectWatermark {
        /// Video files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Number of frames to sample (default from config)
        #[arg(short, long)]
        samples: Option<usize>,

        /// Print JSON reports
        #[arg(long)]
        json: bool,
    },

    /// Burn a subtitle file into the video
    BurnSubtitles {
        /// Input video file
        input: PathBuf,

        /// Subtitle file (default: looked up next to the video)
        #[arg(long)]
        srt: Option<PathBuf>,

        /// Output video (default: <dir>/subtitled/<file name>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Transcribe the video and burn the generated subtitles into it
    Caption {
        /// Input video file
        input: PathBuf,

        /// Output video (default: <dir>/subtitled/<file name>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        whisper: WhisperArgs,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Check that the external tools can be launched
    Check,

    /// Write the default configuration file
    InitConfig {
        /// Where to write it
        #[arg(short, long, default_value = crate::config::DEFAULT_CONFIG_FILE)]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(ClapArgs, Debug, Default)]
pub struct WhisperArgs {
    /// Whisper model (tiny, base, small, medium, large)
    #[arg(long)]
    pub model: Option<String>,

    /// Spoken language, or "auto" to detect it
    #[arg(short, long)]
    pub language: Option<String>,
}

/// Style overrides on top of the `[style]` config section
#[derive(ClapArgs, Debug, Default)]
pub struct StyleArgs {
    #[arg(long)]
    pub font: Option<String>,

    #[arg(long)]
    pub font_size: Option<u32>,

    /// Text color, `#RRGGBB` or a name
    #[arg(long)]
    pub color: Option<String>,

    #[arg(long)]
    pub outline_color: Option<String>,

    /// Outline width in pixels
    #[arg(long)]
    pub outline: Option<u32>,

    #[arg(long, value_enum)]
    pub position: Option<SubtitlePosition>,

    /// Vertical margin in pixels
    #[arg(long)]
    pub margin: Option<u32>,
}

impl StyleArgs {
    pub fn apply_to(&self, style: &mut SubtitleStyle) {
        if let Some(font) = &self.font {
            style.font_name = font.clone();
        }
        if let Some(size) = self.font_size {
            style.font_size = size;
        }
        if let Some(color) = &self.color {
            style.primary_color = color.clone();
        }
        if let Some(color) = &self.outline_color {
            style.outline_color = color.clone();
        }
        if let Some(outline) = self.outline {
            style.outline = outline;
        }
        if let Some(position) = self.position {
            style.position = position;
        }
        if let Some(margin) = self.margin {
            style.margin_v = margin;
        }
    }
}
